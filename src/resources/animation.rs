use std::ops::{Add, Mul};

use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
    // TODO: implement morphing
    Other,
}

impl Keyframes {
    fn len(&self) -> usize {
        match self {
            Keyframes::Translation(v) => v.len(),
            Keyframes::Rotation(v) => v.len(),
            Keyframes::Scale(v) => v.len(),
            Keyframes::Other => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Keyframes are `[in-tangent, value, out-tangent]` triples evaluated as
    /// a cubic Hermite spline.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(interpolation: gltf::animation::Interpolation) -> Self {
        match interpolation {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

/// The value of one animated property at some point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
}

/// Keyframes of a single property of a single node.
#[derive(Clone, Debug)]
pub struct Channel {
    /// Index of the animated node in the scene graph.
    pub node: usize,
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

/// Where a sample time falls between two keyframes.
#[derive(Clone, Copy, Debug)]
struct Segment {
    from: usize,
    to: usize,
    /// Progress from `from` to `to` in `0..1`.
    amount: f32,
    /// Seconds between the two keyframes.
    span: f32,
}

/// Cubic Hermite spline from `v0` to `v1`. `b0` is the out-tangent of the
/// first keyframe and `a1` the in-tangent of the second.
fn hermite<V>(v0: V, b0: V, a1: V, v1: V, span: f32, t: f32) -> V
where
    V: Copy + Add<Output = V> + Mul<f32, Output = V>,
{
    let t2 = t * t;
    let t3 = t2 * t;
    v0 * (2.0 * t3 - 3.0 * t2 + 1.0)
        + b0 * ((t3 - 2.0 * t2 + t) * span)
        + v1 * (-2.0 * t3 + 3.0 * t2)
        + a1 * ((t3 - t2) * span)
}

impl Channel {
    pub fn new(node: usize, interpolation: Interpolation, timestamps: Vec<f32>, keyframes: Keyframes) -> Self {
        Self {
            node,
            interpolation,
            timestamps,
            keyframes,
        }
    }

    /// Keyframe output elements per timestamp.
    fn stride(&self) -> usize {
        match self.interpolation {
            Interpolation::CubicSpline => 3,
            Interpolation::Step | Interpolation::Linear => 1,
        }
    }

    fn segment(&self, time: f32) -> Option<Segment> {
        let count = self.timestamps.len().min(self.keyframes.len() / self.stride());
        if count == 0 {
            return None;
        }
        let times = &self.timestamps[..count];
        let hold = |idx| Segment {
            from: idx,
            to: idx,
            amount: 0.0,
            span: 0.0,
        };
        if time <= times[0] {
            return Some(hold(0));
        }
        if time >= times[count - 1] {
            return Some(hold(count - 1));
        }
        let next = times.partition_point(|&t| t <= time);
        let prev = next - 1;
        let span = times[next] - times[prev];
        let amount = if span > 0.0 { (time - times[prev]) / span } else { 0.0 };
        Some(match self.interpolation {
            Interpolation::Step => hold(prev),
            Interpolation::Linear | Interpolation::CubicSpline => Segment {
                from: prev,
                to: next,
                amount,
                span,
            },
        })
    }

    fn interpolate<V>(&self, values: &[V], segment: Segment, lerp: impl Fn(V, V, f32) -> V) -> V
    where
        V: Copy + Add<Output = V> + Mul<f32, Output = V>,
    {
        let Segment { from, to, amount, span } = segment;
        match self.interpolation {
            Interpolation::CubicSpline if from != to => hermite(
                values[3 * from + 1],
                values[3 * from + 2],
                values[3 * to],
                values[3 * to + 1],
                span,
                amount,
            ),
            Interpolation::CubicSpline => values[3 * from + 1],
            Interpolation::Step | Interpolation::Linear => lerp(values[from], values[to], amount),
        }
    }

    /// Sample the channel at `time` seconds. Times outside the keyframe range
    /// hold the first or last value.
    pub fn sample(&self, time: f32) -> Option<Sample> {
        let segment = self.segment(time)?;
        match &self.keyframes {
            Keyframes::Translation(values) => Some(Sample::Translation(self.interpolate(
                values,
                segment,
                Vector3::lerp,
            ))),
            Keyframes::Scale(values) => Some(Sample::Scale(self.interpolate(values, segment, Vector3::lerp))),
            Keyframes::Rotation(values) => {
                let rotation = self.interpolate(values, segment, |from, to, amount| {
                    if amount == 0.0 { from } else { from.slerp(to, amount) }
                });
                Some(Sample::Rotation(rotation.normalize()))
            }
            Keyframes::Other => None,
        }
    }
}

/// A named animation: channels that play together.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    /// Seconds until the last keyframe of the longest channel.
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: String, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|channel| channel.timestamps.last().copied())
            .fold(0.0, f32::max);
        Self {
            name,
            channels,
            duration,
        }
    }
}

pub fn read_animations(document: &gltf::Document, buffers: &[Vec<u8>]) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let channels = animation
                .channels()
                .filter_map(|channel| {
                    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
                    let timestamps: Vec<f32> = match reader.read_inputs() {
                        Some(times) => times.collect(),
                        None => {
                            log::warn!("No keyframe times found in channel {}", channel.index());
                            return None;
                        }
                    };
                    let keyframes = match reader.read_outputs() {
                        Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                            Keyframes::Translation(translations.map(Vector3::from).collect())
                        }
                        Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                            Keyframes::Rotation(
                                rotations
                                    .into_f32()
                                    // glTF stores quaternions as [x, y, z, w]
                                    .map(|[x, y, z, w]| Quaternion::new(w, x, y, z))
                                    .collect(),
                            )
                        }
                        Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                            Keyframes::Scale(scales.map(Vector3::from).collect())
                        }
                        Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => {
                            log::debug!("Morph target channel {} is ignored", channel.index());
                            return None;
                        }
                        None => {
                            log::warn!("No keyframes found in channel {}", channel.index());
                            return None;
                        }
                    };
                    Some(Channel::new(
                        channel.target().node().index(),
                        channel.sampler().interpolation().into(),
                        timestamps,
                        keyframes,
                    ))
                })
                .collect();
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation {}", animation.index()));
            AnimationClip::new(name, channels)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation3};

    use super::*;

    fn translation(interpolation: Interpolation) -> Channel {
        Channel::new(
            0,
            interpolation,
            vec![0.0, 1.0, 3.0],
            Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 4.0, 0.0),
            ]),
        )
    }

    #[test]
    fn linear_translation_interpolates_between_keys() {
        let channel = translation(Interpolation::Linear);
        assert_eq!(channel.sample(0.5), Some(Sample::Translation(Vector3::new(1.0, 0.0, 0.0))));
        assert_eq!(channel.sample(2.0), Some(Sample::Translation(Vector3::new(2.0, 2.0, 0.0))));
    }

    #[test]
    fn samples_outside_the_range_hold_the_end_values() {
        let channel = translation(Interpolation::Linear);
        assert_eq!(channel.sample(-1.0), Some(Sample::Translation(Vector3::new(0.0, 0.0, 0.0))));
        assert_eq!(channel.sample(10.0), Some(Sample::Translation(Vector3::new(2.0, 4.0, 0.0))));
    }

    #[test]
    fn step_holds_the_previous_key() {
        let channel = translation(Interpolation::Step);
        assert_eq!(channel.sample(0.99), Some(Sample::Translation(Vector3::new(0.0, 0.0, 0.0))));
        assert_eq!(channel.sample(1.0), Some(Sample::Translation(Vector3::new(2.0, 0.0, 0.0))));
    }

    fn spline(out_tangent: Vector3<f32>) -> Channel {
        let zero = Vector3::new(0.0, 0.0, 0.0);
        Channel::new(
            0,
            Interpolation::CubicSpline,
            vec![0.0, 2.0],
            Keyframes::Translation(vec![
                Vector3::new(9.0, 9.0, 9.0),
                zero,
                out_tangent,
                zero,
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(9.0, 9.0, 9.0),
            ]),
        )
    }

    fn translation_at(channel: &Channel, time: f32) -> Vector3<f32> {
        match channel.sample(time) {
            Some(Sample::Translation(value)) => value,
            other => panic!("expected a translation, got {other:?}"),
        }
    }

    #[test]
    fn cubic_spline_follows_the_tangents() {
        // h10(0.5) = 0.125 scaled by the 2s span, h01(0.5) = 0.5
        let curved = translation_at(&spline(Vector3::new(1.0, 0.0, 0.0)), 1.0);
        assert!((curved - Vector3::new(0.75, 0.0, 0.0)).magnitude() < 1e-6, "{curved:?}");

        let flat = translation_at(&spline(Vector3::new(0.0, 0.0, 0.0)), 1.0);
        assert!((flat - Vector3::new(0.5, 0.0, 0.0)).magnitude() < 1e-6, "{flat:?}");
    }

    #[test]
    fn cubic_spline_passes_through_its_keyframe_values() {
        let channel = spline(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(translation_at(&channel, 0.0), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(translation_at(&channel, 2.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(translation_at(&channel, 5.0), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn cubic_spline_rotations_stay_normalized() {
        let tangent = Quaternion::new(0.0, 0.0, 2.0, 0.0);
        let zero = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        let channel = Channel::new(
            0,
            Interpolation::CubicSpline,
            vec![0.0, 1.0],
            Keyframes::Rotation(vec![
                zero,
                Quaternion::from_angle_y(Deg(0.0)),
                tangent,
                tangent,
                Quaternion::from_angle_y(Deg(90.0)),
                zero,
            ]),
        );
        let Some(Sample::Rotation(rotation)) = channel.sample(0.5) else {
            panic!("expected a rotation");
        };
        assert!((rotation.magnitude() - 1.0).abs() < 1e-5);
        assert!(rotation.v.y > 0.0);
    }

    #[test]
    fn rotation_is_spherically_interpolated() {
        let channel = Channel::new(
            3,
            Interpolation::Linear,
            vec![0.0, 1.0],
            Keyframes::Rotation(vec![
                Quaternion::from_angle_y(Deg(0.0)),
                Quaternion::from_angle_y(Deg(90.0)),
            ]),
        );
        let Some(Sample::Rotation(half)) = channel.sample(0.5) else {
            panic!("expected a rotation");
        };
        let expected = Quaternion::from_angle_y(Deg(45.0));
        assert!((half.s - expected.s).abs() < 1e-5);
        assert!((half.v.y - expected.v.y).abs() < 1e-5);
    }

    #[test]
    fn clip_duration_is_the_last_keyframe() {
        let clip = AnimationClip::new(
            "spin".into(),
            vec![translation(Interpolation::Linear), Channel::new(1, Interpolation::Step, vec![0.0, 7.5], Keyframes::Other)],
        );
        assert_eq!(clip.duration, 7.5);
    }
}
