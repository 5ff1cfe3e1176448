use anyhow::Context as _;
use indicatif::ProgressBar;

use kdtrace::{
    Camera, RenderSettings, Scene,
    geometry::{ScreenSize, WorldPoint, WorldVector},
    render,
};

fn setup_logging() -> anyhow::Result<()> {
    let colors = fern::colors::ColoredLevelConfig::new()
        .error(fern::colors::Color::Red)
        .warn(fern::colors::Color::Yellow)
        .info(fern::colors::Color::Green);

    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .format(move |out, message, record| {
            out.finish(format_args!("[{}] {}", colors.color(record.level()), message))
        })
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    setup_logging()?;

    let scene = Scene::reference().context("building the reference scene")?;
    log::info!(
        "scene: {} primitives, index: {}",
        scene.primitive_count(),
        scene.index_statistics()
    );

    let camera = Camera::builder()
        .center(WorldPoint::new(0.0, 3.2, -2.8))
        .forward(WorldVector::new(0.0, -0.25, 1.0))
        .up(WorldVector::new(0.0, 1.0, 0.0))
        .resolution(ScreenSize::new(720, 480))
        .vertical_fov(70f32.to_radians())
        .aperture(0.02)
        .focus_distance(4.0)
        .build();

    let settings = RenderSettings {
        tile_size: 64.try_into()?,
        sample_count: 64.try_into()?,
        ..RenderSettings::default()
    };

    let bar = ProgressBar::no_length();
    let progress = render(scene, camera, settings, |_| {}, {
        let bar = bar.clone();
        move |_| bar.inc(1)
    })
    .context("starting the render")?;
    bar.set_length(progress.progress().total as u64);

    let frame = progress.wait().context("rendering")?;
    bar.finish();

    let path = "render.png";
    frame.to_image().save(path).context("writing the image")?;
    log::info!("wrote {path}");

    Ok(())
}
