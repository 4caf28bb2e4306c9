//! Playback of animation clips on a scene graph.
//!
//! An [`AnimationMixer`] owns one [`AnimationAction`] per clip. Every frame it
//! advances the playing actions, samples their channels and writes the
//! weighted result into the local transforms of the animated nodes.

use std::collections::HashMap;

use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};
use instant::Instant;

use crate::{
    data_structures::{instance::Instance, scene_graph::SceneGraph},
    resources::animation::{AnimationClip, Sample},
};

/// Measures the time between frames. The first call reports zero.
#[derive(Debug, Default)]
pub struct Clock {
    last: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call.
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = self.last.map_or(0.0, |last| (now - last).as_secs_f32());
        self.last = Some(now);
        delta
    }
}

/// Playback state of a single clip.
#[derive(Clone, Debug)]
pub struct AnimationAction {
    clip: AnimationClip,
    /// Local time in seconds, within `[0, duration]` while looping.
    pub time: f32,
    pub weight: f32,
    pub time_scale: f32,
    pub looping: bool,
    playing: bool,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 1.0,
            time_scale: 1.0,
            looping: true,
            playing: false,
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    fn advance(&mut self, dt: f32) {
        let duration = self.clip.duration;
        let time = self.time + dt * self.time_scale;
        self.time = if duration <= 0.0 {
            0.0
        } else if self.looping {
            time.rem_euclid(duration)
        } else {
            time.clamp(0.0, duration)
        };
    }
}

/// Weighted sum of the samples hitting one node.
#[derive(Default)]
struct Blend {
    translation: Option<(Vector3<f32>, f32)>,
    rotation: Option<(Quaternion<f32>, f32)>,
    scale: Option<(Vector3<f32>, f32)>,
}

impl Blend {
    fn add(&mut self, sample: Sample, weight: f32) {
        fn accumulate<T>(slot: &mut Option<(T, f32)>, value: T, weight: f32, mix: impl Fn(T, T, f32) -> T) {
            *slot = Some(match slot.take() {
                None => (value, weight),
                Some((acc, total)) => {
                    let total = total + weight;
                    (mix(acc, value, weight / total), total)
                }
            });
        }
        match sample {
            Sample::Translation(v) => accumulate(&mut self.translation, v, weight, |a, b, t| a.lerp(b, t)),
            Sample::Scale(v) => accumulate(&mut self.scale, v, weight, |a, b, t| a.lerp(b, t)),
            Sample::Rotation(q) => {
                accumulate(&mut self.rotation, q, weight, |a, b, t| a.slerp(b, t).normalize())
            }
        }
    }

    /// Mix the blended values over the rest pose. Properties with a total
    /// weight below one keep part of the rest pose.
    fn resolve(self, rest: &Instance) -> Instance {
        let translation = match self.translation {
            Some((v, w)) if w < 1.0 => rest.position.lerp(v, w),
            Some((v, _)) => v,
            None => rest.position,
        };
        let rotation = match self.rotation {
            Some((q, w)) if w < 1.0 => rest.rotation.slerp(q, w).normalize(),
            Some((q, _)) => q,
            None => rest.rotation,
        };
        let scale = match self.scale {
            Some((v, w)) if w < 1.0 => rest.scale.lerp(v, w),
            Some((v, _)) => v,
            None => rest.scale,
        };
        Instance {
            position: translation,
            rotation,
            scale,
        }
    }
}

#[derive(Debug, Default)]
pub struct AnimationMixer {
    actions: Vec<AnimationAction>,
    /// Local transforms of animated nodes before the first update.
    rest_pose: HashMap<usize, Instance>,
    /// Total time the mixer has been advanced by.
    pub time: f32,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action for `clip`. It starts stopped; call
    /// [`play`](AnimationAction::play) on the returned action.
    pub fn clip_action(&mut self, clip: AnimationClip) -> &mut AnimationAction {
        self.actions.push(AnimationAction::new(clip));
        let idx = self.actions.len() - 1;
        &mut self.actions[idx]
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// Advance playing actions by `dt` seconds and pose `graph` accordingly.
    /// World transforms are refreshed afterwards.
    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph) {
        self.time += dt;

        let mut blends: HashMap<usize, Blend> = HashMap::new();
        for action in self.actions.iter_mut().filter(|a| a.playing && a.weight > 0.0) {
            action.advance(dt);
            for channel in &action.clip.channels {
                if channel.node >= graph.nodes.len() {
                    continue;
                }
                if let Some(sample) = channel.sample(action.time) {
                    blends.entry(channel.node).or_default().add(sample, action.weight);
                }
            }
        }

        for (idx, blend) in blends {
            let node = &mut graph.nodes[idx];
            let rest = *self.rest_pose.entry(idx).or_insert(node.local);
            node.local = blend.resolve(&rest);
        }
        graph.update_world_transforms();
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::{
        data_structures::scene_graph::Node,
        resources::animation::{Channel, Interpolation, Keyframes},
    };

    fn slide(node: usize, to: f32) -> AnimationClip {
        AnimationClip::new(
            format!("slide to {to}"),
            vec![Channel::new(
                node,
                Interpolation::Linear,
                vec![0.0, 2.0],
                Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(to, 0.0, 0.0)]),
            )],
        )
    }

    fn graph() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let idx = graph.add_node(Node::new(Some("dish".into()), Vector3::new(0.0, 5.0, 0.0).into()));
        graph.roots.push(idx);
        graph.update_world_transforms();
        graph
    }

    #[test]
    fn first_clock_delta_is_zero() {
        let mut clock = Clock::new();
        assert_eq!(clock.delta(), 0.0);
        assert!(clock.delta() >= 0.0);
    }

    #[test]
    fn actions_start_stopped() {
        let mut mixer = AnimationMixer::new();
        mixer.clip_action(slide(0, 4.0));
        assert!(!mixer.actions()[0].is_playing());

        let mut graph = graph();
        mixer.update(1.0, &mut graph);
        assert_eq!(graph.nodes[0].local.position, Vector3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn playing_action_poses_the_node() {
        let mut mixer = AnimationMixer::new();
        mixer.clip_action(slide(0, 4.0)).play();
        let mut graph = graph();
        mixer.update(1.0, &mut graph);
        assert_eq!(graph.nodes[0].local.position, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(graph.nodes[0].world_position(), Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn looping_wraps_around_the_duration() {
        let mut mixer = AnimationMixer::new();
        mixer.clip_action(slide(0, 4.0)).play();
        let mut graph = graph();
        mixer.update(2.5, &mut graph);
        assert_eq!(mixer.actions()[0].time, 0.5);
        assert_eq!(graph.nodes[0].local.position, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn non_looping_action_holds_the_last_frame() {
        let mut mixer = AnimationMixer::new();
        let action = mixer.clip_action(slide(0, 4.0)).play();
        action.looping = false;
        let mut graph = graph();
        mixer.update(7.0, &mut graph);
        assert_eq!(mixer.actions()[0].time, 2.0);
        assert_eq!(graph.nodes[0].local.position, Vector3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn simultaneous_actions_are_blended_by_weight() {
        let mut mixer = AnimationMixer::new();
        mixer.clip_action(slide(0, 4.0)).play();
        mixer.clip_action(slide(0, 8.0)).play();
        let mut graph = graph();
        mixer.update(1.0, &mut graph);
        // equal weights: halfway between 2 and 4
        assert_eq!(graph.nodes[0].local.position, Vector3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn partial_weight_keeps_part_of_the_rest_pose() {
        let mut mixer = AnimationMixer::new();
        let action = mixer.clip_action(slide(0, 4.0)).play();
        action.weight = 0.5;
        action.looping = false;
        let mut graph = graph();
        mixer.update(2.0, &mut graph);
        assert_eq!(graph.nodes[0].local.position, Vector3::new(2.0, 2.5, 0.0));
    }

    #[test]
    fn channels_for_missing_nodes_are_ignored() {
        let mut mixer = AnimationMixer::new();
        mixer.clip_action(slide(42, 4.0)).play();
        let mut graph = graph();
        mixer.update(1.0, &mut graph);
        assert_eq!(graph.nodes[0].local.position, Vector3::new(0.0, 5.0, 0.0));
    }
}
