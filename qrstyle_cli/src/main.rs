use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use serde::Deserialize;

use qrstyle_core::{Color, Ecl, ModuleGrid, PixelView, RoleTable, Symbol, Version};
use qrstyle_render::{
    render_roles, render_symbol, render_to_size, sizing, write_gif, AsciiRenderer, Backdrop,
    IconDescriptor, ImageMode, ImagePayload, Rasterizer, StyleConfig, StyleKind, SvgWriter,
    WatermarkDescriptor,
};

/// Pixels per module when neither a size nor a magnification is requested.
const DEFAULT_MAGNIFICATION: u32 = 10;

#[derive(Parser)]
#[command(name = "qrstyle")]
#[command(version)]
#[command(propagate_version = true)]
#[command(about = "Style and render QR code module grids from the command line", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Style a module grid and write it out.
    #[command(flatten_help = true)]
    Render {
        #[arg(
            help = "Module grid: a text file of '#' and '.' rows, or an image with one pixel per module"
        )]
        grid: PathBuf,
        #[arg(
            short,
            long,
            help = "Output file or stdout if unspecified",
            long_help = "Output file or stdout if unspecified. The output format is determined based on the extension. \
            Supported extensions are:\n\
            * text: .txt\n\
            * vector: .svg\n\
            * images: .png, .gif"
        )]
        output: Option<PathBuf>,
        #[arg(short, long, help = "JSON style description")]
        style: Option<PathBuf>,
        #[arg(short, long, default_value = "H", help = "Error correction level of the symbol")]
        ecl: Ecl,
        #[arg(short, long, default_value_t = 0, help = "Quiet zone modules already in the grid")]
        border: usize,
        #[arg(long, conflicts_with = "magnification", help = "Side of the output in pixels")]
        size: Option<u32>,
        #[arg(short, long, help = "Pixels per module of raster outputs")]
        magnification: Option<u32>,
        #[arg(long, help = "Swap light and dark modules of text outputs")]
        invert: bool,
    },
    /// Print the role of every module of a symbol version.
    Roles {
        #[arg(help = "Symbol version, 1 to 40")]
        version: u8,
        #[arg(short, long, default_value_t = 0)]
        border: usize,
    },
    /// Print the magnifications suitable for rendering a number of modules at a target size.
    Size {
        #[arg(long, help = "Modules along one side, quiet zone included")]
        modules: usize,
        #[arg(long, help = "Target side in pixels")]
        target: f64,
        #[arg(long, help = "Require multiples of 3")]
        thirds: bool,
    },
}

enum Output {
    Stdout,
    Text(PathBuf),
    Svg(PathBuf),
    Png(PathBuf),
    Gif(PathBuf),
}

fn determine_output_kind(path: Option<PathBuf>) -> Result<Output> {
    let Some(path) = path else {
        return Ok(Output::Stdout);
    };
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("txt") => Ok(Output::Text(path)),
        Some("svg") => Ok(Output::Svg(path)),
        Some("png") => Ok(Output::Png(path)),
        Some("gif") => Ok(Output::Gif(path)),
        Some(invalid) => Err(anyhow::Error::msg(format!(
            "invalid output extension '{}'",
            invalid
        ))),
        None => Err(anyhow::Error::msg("requested output has no extension")),
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_percentage() -> f64 {
    0.2
}

fn default_border_color() -> Color {
    Color::WHITE
}

#[derive(Deserialize)]
struct IconFile {
    path: PathBuf,
    #[serde(default)]
    mode: ImageMode,
    #[serde(default = "default_opacity")]
    opacity: f64,
    #[serde(default = "default_border_color")]
    border_color: Color,
    #[serde(default = "default_percentage")]
    percentage: f64,
}

#[derive(Deserialize)]
struct WatermarkFile {
    path: PathBuf,
    #[serde(default)]
    mode: ImageMode,
    #[serde(default = "default_opacity")]
    opacity: f64,
    #[serde(default)]
    shrink_modules: bool,
}

/// On-disk style: a [StyleConfig] whose images are given by path, relative to the style file.
#[derive(Deserialize, Default)]
#[serde(default)]
struct StyleFile {
    style: StyleKind,
    backdrop: Backdrop,
    icon: Option<IconFile>,
    watermark: Option<WatermarkFile>,
}

fn load_grid(path: &Path) -> Result<ModuleGrid> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("txt") {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read grid {}", path.display()))?;
        return Ok(ModuleGrid::from_text(&text)?);
    }
    let image = image::open(path)
        .with_context(|| format!("cannot open grid image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let view = PixelView::new(image.as_raw(), width as usize, height as usize)?;
    Ok(ModuleGrid::from_pixels(&view)?)
}

/// Decode the image at `path`. GIFs with more than one frame become animations.
fn load_image(path: &Path) -> Result<ImagePayload> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("gif") {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let frames = GifDecoder::new(BufReader::new(file))?
            .into_frames()
            .collect_frames()?;
        if frames.len() > 1 {
            log::info!("loaded {} frames from {}", frames.len(), path.display());
            let delays: Vec<Duration> = frames.iter().map(|f| Duration::from(f.delay())).collect();
            let images = frames.into_iter().map(|f| f.into_buffer()).collect();
            return Ok(ImagePayload::animated(images, delays)?);
        }
    }
    let image = image::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(ImagePayload::Static(image.to_rgba8()))
}

fn load_style(path: Option<&Path>) -> Result<StyleConfig> {
    let Some(path) = path else {
        return Ok(StyleConfig::default());
    };
    let file = File::open(path).with_context(|| format!("cannot open style {}", path.display()))?;
    let style: StyleFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid style {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut config = StyleConfig::new(style.style).with_backdrop(style.backdrop);
    if let Some(icon) = style.icon {
        let image = load_image(&base.join(&icon.path))?;
        config = config.with_icon(
            IconDescriptor::new(image)
                .with_mode(icon.mode)
                .with_opacity(icon.opacity)
                .with_border_color(icon.border_color)
                .with_percentage(icon.percentage),
        );
    }
    if let Some(watermark) = style.watermark {
        let image = load_image(&base.join(&watermark.path))?;
        config = config.with_watermark(
            WatermarkDescriptor::new(image)
                .with_mode(watermark.mode)
                .with_opacity(watermark.opacity)
                .with_shrunk_modules(watermark.shrink_modules),
        );
    }
    Ok(config)
}

struct RenderRequest {
    output: Output,
    size: Option<u32>,
    magnification: Option<u32>,
    invert: bool,
}

fn render(symbol: &Symbol, style: &StyleConfig, request: RenderRequest) -> Result<()> {
    let thirds = style.requires_thirds();
    let rasterizer = || {
        let magnification = request.magnification.unwrap_or(DEFAULT_MAGNIFICATION);
        if thirds && magnification % 3 != 0 {
            log::warn!("magnification {} is not a multiple of 3", magnification);
        }
        Rasterizer::new(magnification)
    };
    let text = || {
        let renderer = AsciiRenderer::new().with_quiet_zone(style.backdrop.quiet_zone);
        if request.invert {
            renderer.inverted()
        } else {
            renderer
        }
    };
    match request.output {
        Output::Stdout => {
            text().render(&mut std::io::stdout().lock(), symbol)?;
        }
        Output::Text(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            text().render(&mut writer, symbol)?;
            writer.flush()?;
        }
        Output::Svg(path) => {
            let drawing = render_symbol(symbol, style)?;
            let mut writer = BufWriter::new(File::create(path)?);
            let svg = match request.size {
                Some(size) => SvgWriter::new().with_size(size),
                None => SvgWriter::new(),
            };
            svg.write(&mut writer, &drawing)?;
            writer.flush()?;
        }
        Output::Png(path) => {
            let drawing = render_symbol(symbol, style)?;
            let image = match request.size {
                Some(size) => render_to_size(&drawing, size, thirds)?,
                None => rasterizer().render(&drawing)?,
            };
            let animated = [drawing.watermark, drawing.icon]
                .into_iter()
                .flatten()
                .any(ImagePayload::is_animated);
            if animated {
                log::warn!("PNG output keeps the first frame of the animation only");
            }
            image.save(&path)?;
        }
        Output::Gif(path) => {
            let drawing = render_symbol(symbol, style)?;
            let rasterizer = match request.size {
                Some(size) => Rasterizer::fitting(&drawing, size as f64, thirds)?,
                None => rasterizer(),
            };
            let frames = rasterizer.render_frames(&drawing)?;
            write_gif(BufWriter::new(File::create(path)?), frames)?;
        }
    }
    Ok(())
}

/// Level forced by `-v` flags. Without any, `RUST_LOG` decides and defaults to warnings.
fn verbosity_level(verbose: u8) -> Option<log::LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(log::LevelFilter::Info),
        2 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = verbosity_level(cli.verbose) {
        logger.filter_level(level);
    }
    logger.init();

    match cli.command {
        Command::Render {
            grid,
            output,
            style,
            ecl,
            border,
            size,
            magnification,
            invert,
        } => {
            // Before doing anything, make sure the requested output is valid.
            let output = determine_output_kind(output)?;
            let symbol = Symbol::from_grid(load_grid(&grid)?, ecl, border)?;
            log::info!(
                "rendering {} symbol of {} modules",
                symbol.meta().version,
                symbol.dimension()
            );
            let style = load_style(style.as_deref())?;
            let request = RenderRequest {
                output,
                size,
                magnification,
                invert,
            };
            render(&symbol, &style, request)?;
        }
        Command::Roles { version, border } => {
            let roles = RoleTable::new(Version::new(version)?, border);
            render_roles(&mut std::io::stdout().lock(), &roles)?;
        }
        Command::Size {
            modules,
            target,
            thirds,
        } => {
            println!(
                "suitable size: {}",
                sizing::min_suitable_size(modules, target)?
            );
            println!(
                "magnification: {} to {}",
                sizing::max_magnification(modules, target, thirds)?,
                sizing::min_magnification(modules, target, thirds)?
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use image::{Rgba, RgbaImage};
    use qrstyle_core::qrstandard;
    use qrstyle_render::PositionStyle;

    fn version_1_text() -> String {
        let roles = RoleTable::new(Version::MIN, 0);
        let mut text = String::new();
        for y in 0..roles.dimension() {
            for x in 0..roles.dimension() {
                let (dx, dy) = (x % 14, y % 14);
                let finder = roles.role(x, y) == qrstyle_core::ModuleRole::FinderPattern
                    && dx < 7
                    && dy < 7
                    && dx.min(dy).min(6 - dx).min(6 - dy) != 1;
                text.push(if finder || (x + y) % 5 == 0 { '#' } else { '.' });
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_output_kinds() {
        assert!(matches!(determine_output_kind(None), Ok(Output::Stdout)));
        assert!(matches!(
            determine_output_kind(Some("a.svg".into())),
            Ok(Output::Svg(_))
        ));
        assert!(matches!(
            determine_output_kind(Some("a.gif".into())),
            Ok(Output::Gif(_))
        ));
        assert!(determine_output_kind(Some("a.jpg".into())).is_err());
        assert!(determine_output_kind(Some("a".into())).is_err());
    }

    #[test]
    fn test_grid_from_text_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("grid.txt");
        std::fs::write(&text_path, version_1_text()).unwrap();
        let grid = load_grid(&text_path).unwrap();
        assert_eq!(grid.size(), qrstandard::symbol_size(Version::MIN));

        let image = RgbaImage::from_fn(21, 21, |x, y| {
            if grid.is_dark(x as usize, y as usize) {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let image_path = dir.path().join("grid.png");
        image.save(&image_path).unwrap();
        assert_eq!(load_grid(&image_path).unwrap(), grid);
    }

    #[test]
    fn test_style_file_with_images() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]))
            .save(dir.path().join("icon.png"))
            .unwrap();
        let style_path = dir.path().join("style.json");
        std::fs::write(
            &style_path,
            r##"{
                "style": {"kind": "basic", "position": {"style": "planets"}},
                "backdrop": {"color": "#fafafa", "quiet_zone": 2},
                "icon": {"path": "icon.png", "percentage": 0.25, "mode": "scaleAspectFit"}
            }"##,
        )
        .unwrap();
        let style = load_style(Some(&style_path)).unwrap();
        let StyleKind::Basic(params) = style.style else {
            panic!("expected the basic style");
        };
        assert_eq!(params.position.style, PositionStyle::Planets);
        assert_eq!(style.backdrop.quiet_zone, 2);
        let icon = style.icon.unwrap();
        assert_eq!(icon.mode, ImageMode::ScaleAspectFit);
        assert_eq!(icon.percentage, 0.25);
        assert_eq!(icon.opacity, 1.0);
        assert_eq!(icon.image.size().width, 4.0);
        assert!(style.watermark.is_none());

        assert!(load_style(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_render_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let grid = ModuleGrid::from_text(&version_1_text()).unwrap();
        let symbol = Symbol::from_grid(grid, Ecl::M, 0).unwrap();
        let style = StyleConfig::default();
        for name in ["out.txt", "out.svg", "out.png", "out.gif"] {
            let path = dir.path().join(name);
            let request = RenderRequest {
                output: determine_output_kind(Some(path.clone())).unwrap(),
                size: None,
                magnification: Some(2),
                invert: false,
            };
            render(&symbol, &style, request).unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > 0, "{}", name);
        }
        let png = image::open(dir.path().join("out.png")).unwrap();
        assert_eq!(png.width(), 23 * 2);

        let sized = dir.path().join("sized.png");
        let request = RenderRequest {
            output: Output::Png(sized.clone()),
            size: Some(100),
            magnification: None,
            invert: false,
        };
        render(&symbol, &style, request).unwrap();
        assert_eq!(image::open(sized).unwrap().width(), 100);

        let text = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(text.lines().count(), 23);

        // Inverted text turns the light quiet zone dark.
        let inverted = dir.path().join("inverted.txt");
        let request = RenderRequest {
            output: Output::Text(inverted.clone()),
            size: None,
            magnification: None,
            invert: true,
        };
        render(&symbol, &style, request).unwrap();
        let text = std::fs::read_to_string(inverted).unwrap();
        assert!(text.starts_with("██"));
    }

    #[test]
    fn test_verbosity_leaves_rust_log_in_charge() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some(log::LevelFilter::Info));
        assert_eq!(verbosity_level(2), Some(log::LevelFilter::Debug));
        assert_eq!(verbosity_level(7), Some(log::LevelFilter::Trace));
    }

    #[test]
    fn test_image_fill_style_file() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([200, 40, 40, 255]))
            .save(dir.path().join("fill.png"))
            .unwrap();
        let style_path = dir.path().join("style.json");
        std::fs::write(
            &style_path,
            r##"{
                "style": {"kind": "imageFill", "mask": "rgba(0, 0, 0, 0.2)"},
                "watermark": {"path": "fill.png"}
            }"##,
        )
        .unwrap();
        let style = load_style(Some(&style_path)).unwrap();
        assert!(matches!(style.style, StyleKind::ImageFill(_)));
        let grid = ModuleGrid::from_text(&version_1_text()).unwrap();
        let symbol = Symbol::from_grid(grid, Ecl::M, 0).unwrap();
        let path = dir.path().join("fill.svg");
        let request = RenderRequest {
            output: Output::Svg(path.clone()),
            size: None,
            magnification: None,
            invert: false,
        };
        render(&symbol, &style, request).unwrap();
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.contains(r#"mask="url(#modules)""#));
    }
}
