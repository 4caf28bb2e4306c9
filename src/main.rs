fn main() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    hero_scene::run(hero_scene::ViewerConfig::from_env())?;
    Ok(())
}
