//! Turns a classified module grid and a [StyleConfig] into an ordered list of [DrawPrimitive]s.
//!
//! Modules are visited in row-major order (`y` outer, `x` inner). The watermark, when configured,
//! is the first primitive and the icon always comes last. The image fill style draws the watermark
//! inside its masked run instead.

use itertools::iproduct;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use qrstyle_core::{
    Color, Ecl, Error, ModuleGrid, ModuleRole, Point, Rect, RoleTable, Size, Symbol,
};

use crate::primitive::Emitter;
use crate::{
    BasicParams, Drawing, IconDescriptor, ImageFillParams, ImageSlot, ModuleMask, ModuleShape,
    PatternParams, PatternTreatment, PositionParams, PositionStyle, RandomRectangleParams, Shape,
    StyleConfig, StyleKind, WatermarkDescriptor,
};

/// Radius of the light disk laid under round finder decorations.
const BACKING_RADIUS: f64 = 5.0;
const CORE_RADIUS: f64 = 1.5;
const RING_RADIUS: f64 = 3.0;
const ORBIT_STROKE: f64 = 0.15;
const ORBIT_DASH: f64 = 0.5;
/// Side and corner radius of the outline of rounded rectangle finder decorations.
const FRAME_SIDE: f64 = 6.0;
const FRAME_RADIUS: f64 = 1.92;
/// Distance from the finder center to the middle of the bars of dsj decorations.
const BAR_DISTANCE: f64 = 3.0;
/// Range of the diameter factor of randomly sized round modules.
const RANDOM_ROUND_MIN: f64 = 0.33;
const RANDOM_ROUND_MAX: f64 = 1.0;
/// Amount subtracted from every channel of the shadow of random rectangles.
const SHADOW_OFFSET: f64 = 40.0;
/// Fraction of the icon margin taken by the visible border around the icon image.
const ICON_BORDER: f64 = 0.024;

/// Style `grid`, whose module roles are `roles`, with `style`. `ecl` bounds the icon size.
///
/// Either every primitive is produced or an error is returned.
/// # Example
/// ```
/// use qrstyle_core::{Ecl, Module, ModuleGrid, RoleTable, Version};
/// use qrstyle_render::{pipeline, StyleConfig};
/// let grid = ModuleGrid::filled(21, Module::Dark);
/// let roles = RoleTable::new(Version::MIN, 0);
/// let style = StyleConfig::default();
/// let drawing = pipeline::render(&grid, &roles, &style, Ecl::H).unwrap();
/// assert_eq!(drawing.primitives.len(), 21 * 21);
/// ```
pub fn render<'s>(
    grid: &ModuleGrid,
    roles: &RoleTable,
    style: &'s StyleConfig,
    ecl: Ecl,
) -> Result<Drawing<'s>, Error> {
    roles.check_grid(grid)?;
    validate(style)?;
    let dimension = grid.size();
    let canvas = Rect::new(0.0, 0.0, dimension as f64, dimension as f64);
    let mut emitter = Emitter::with_capacity(dimension * dimension + 3);

    let image_fill = matches!(style.style, StyleKind::ImageFill(_));
    if let Some(watermark) = style.watermark.as_ref().filter(|_| !image_fill) {
        emit_watermark(&mut emitter, canvas, watermark)?;
    }
    let mask = match &style.style {
        StyleKind::Basic(params) => {
            emit_basic(&mut emitter, grid, roles, params, style.requires_thirds());
            None
        }
        StyleKind::RandomRectangle(params) => {
            emit_random_rectangles(&mut emitter, grid, params);
            None
        }
        StyleKind::ImageFill(params) => Some(emit_image_fill(
            &mut emitter,
            grid,
            canvas,
            params,
            style.watermark.as_ref(),
        )?),
    };
    if let Some(icon) = &style.icon {
        emit_icon(&mut emitter, canvas, icon, ecl)?;
    }

    let primitives = emitter.finish();
    log::debug!(
        "styled {}x{} grid into {} primitives",
        dimension,
        dimension,
        primitives.len()
    );
    Ok(Drawing {
        dimension,
        backdrop: style.backdrop,
        primitives,
        watermark: style.watermark.as_ref().map(|w| &w.image),
        icon: style.icon.as_ref().map(|i| &i.image),
        mask,
    })
}

/// Same as [render], classifying the modules of `symbol` locally.
pub fn render_symbol<'s>(symbol: &Symbol, style: &'s StyleConfig) -> Result<Drawing<'s>, Error> {
    render(symbol.grid(), &symbol.roles(), style, symbol.meta().ecl)
}

/// Square centered in `canvas` holding the icon, `percentage` of the canvas side but never more
/// than the recovery rate of `ecl`.
/// # Example
/// ```
/// use qrstyle_core::{Ecl, Rect};
/// use qrstyle_render::pipeline;
/// let canvas = Rect::new(0.0, 0.0, 300.0, 300.0);
/// let frame = pipeline::icon_frame(canvas, 0.9, Ecl::H);
/// assert!(frame.width() <= 90.0 + 1e-9);
/// assert_eq!(frame.center(), canvas.center());
/// ```
pub fn icon_frame(canvas: Rect, percentage: f64, ecl: Ecl) -> Rect {
    let ceiling = ecl.recovery_rate();
    let fraction = if percentage > ceiling {
        log::warn!(
            "icon covering {:.0}% of the symbol exceeds the {:.0}% tolerated by ECL {:?}, clamping",
            percentage * 100.0,
            ceiling * 100.0,
            ecl
        );
        ceiling
    } else {
        percentage
    };
    let side = canvas.width().min(canvas.height()) * fraction;
    Rect::centered_in(Size::square(side), canvas)
}

fn validate(style: &StyleConfig) -> Result<(), Error> {
    let unit = |value: f64, what: &str| {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(Error::geometry(format!(
                "{} must be in 0..=1, got {}",
                what, value
            )))
        }
    };
    let side = |value: f64, what: &str| {
        if value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(Error::geometry(format!(
                "{} must be in (0, 1], got {}",
                what, value
            )))
        }
    };
    if let StyleKind::Basic(params) = &style.style {
        side(params.scale, "module scale")?;
        side(params.timing.size, "timing size")?;
        side(params.alignment.size, "alignment size")?;
        unit(params.opacity, "module opacity")?;
        if !(params.position.size.is_finite() && params.position.size > 0.0) {
            return Err(Error::geometry(format!(
                "position size must be positive, got {}",
                params.position.size
            )));
        }
    }
    if let Some(watermark) = &style.watermark {
        unit(watermark.opacity, "watermark opacity")?;
        watermark.image.check()?;
    }
    if let Some(icon) = &style.icon {
        unit(icon.opacity, "icon opacity")?;
        side(icon.percentage, "icon percentage")?;
        icon.image.check()?;
    }
    if !(style.backdrop.corner_radius >= 0.0) {
        return Err(Error::geometry("backdrop corner radius must not be negative"));
    }
    Ok(())
}

fn emit_watermark(
    emitter: &mut Emitter,
    canvas: Rect,
    watermark: &WatermarkDescriptor,
) -> Result<(), Error> {
    let placement = watermark.mode.place(watermark.image.size(), canvas)?;
    emitter.push(
        Shape::Image {
            slot: ImageSlot::Watermark,
            mode: watermark.mode,
            placement,
            clip: canvas,
        },
        watermark.opacity,
    );
    Ok(())
}

fn emit_icon(
    emitter: &mut Emitter,
    canvas: Rect,
    icon: &IconDescriptor,
    ecl: Ecl,
) -> Result<(), Error> {
    let frame = icon_frame(canvas, icon.percentage, ecl);
    let border = (frame.min_x() - canvas.min_x()) * ICON_BORDER;
    let image_box = frame.inset(border);
    let placement = icon.mode.place(icon.image.size(), image_box)?;
    emitter.push(
        Shape::Rect {
            rect: frame,
            corner_radius: frame.width() / 4.0,
            fill: icon.border_color,
        },
        1.0,
    );
    emitter.push(
        Shape::Image {
            slot: ImageSlot::Icon,
            mode: icon.mode,
            placement,
            clip: image_box,
        },
        icon.opacity,
    );
    Ok(())
}

fn cell(x: usize, y: usize) -> Rect {
    Rect::new(x as f64, y as f64, 1.0, 1.0)
}

fn full_cell(emitter: &mut Emitter, x: usize, y: usize, fill: Color, opacity: f64) {
    emitter.push(
        Shape::Rect {
            rect: cell(x, y),
            corner_radius: 0.0,
            fill,
        },
        opacity,
    );
}

fn emit_basic(
    emitter: &mut Emitter,
    grid: &ModuleGrid,
    roles: &RoleTable,
    params: &BasicParams,
    thirds: bool,
) {
    let scale = if thirds {
        params.scale.min(1.0 / 3.0)
    } else {
        params.scale
    };
    let position = &params.position;
    // Decorations replacing their finder block go under every module, so the backing disk never
    // hides a neighbouring module.
    let absorbed = position.style.absorbs_finder();
    if absorbed {
        for (x, y) in roles.finder_centers() {
            if grid.is_dark(x, y) {
                emit_position_decoration(emitter, cell(x, y).center(), position);
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    for (x, y, module) in grid.modules() {
        let data_fill = if module.is_dark() {
            params.dark
        } else {
            params.light
        };
        let role = roles.role(x, y);
        let pattern = match role {
            ModuleRole::TimingPattern => Some(&params.timing),
            ModuleRole::AlignmentPattern => Some(&params.alignment),
            _ => None,
        }
        .filter(|pattern| pattern.treatment != PatternTreatment::Inherit);
        match role {
            ModuleRole::Border => full_cell(emitter, x, y, data_fill, params.opacity),
            ModuleRole::FinderPattern if absorbed => {}
            ModuleRole::FinderPattern => {
                let fill = if module.is_dark() {
                    position.dark
                } else {
                    position.light
                };
                full_cell(emitter, x, y, fill, 1.0)
            }
            _ => match pattern {
                Some(pattern) => {
                    let fill = match (module.is_dark(), pattern.dark) {
                        (true, Some(dark)) => dark,
                        _ => data_fill,
                    };
                    emit_pattern_module(emitter, x, y, pattern, fill, params.opacity)
                }
                None => {
                    let size = match params.shape {
                        ModuleShape::RandomRound => {
                            scale * rng.gen_range(RANDOM_ROUND_MIN..RANDOM_ROUND_MAX)
                        }
                        _ => scale,
                    };
                    emit_module(emitter, x, y, params.shape, size, data_fill, params.opacity)
                }
            },
        }
    }
}

/// Timing or alignment module with a treatment other than [PatternTreatment::Inherit].
fn emit_pattern_module(
    emitter: &mut Emitter,
    x: usize,
    y: usize,
    pattern: &PatternParams,
    fill: Color,
    opacity: f64,
) {
    let shape = match pattern.treatment {
        PatternTreatment::Inherit | PatternTreatment::FullCell => {
            return full_cell(emitter, x, y, fill, opacity);
        }
        PatternTreatment::Rectangle => ModuleShape::Rectangle,
        PatternTreatment::Round => ModuleShape::Circle,
        PatternTreatment::RoundedRectangle => ModuleShape::RoundedRectangle,
    };
    emit_module(emitter, x, y, shape, pattern.size, fill, opacity)
}

/// Module shape of side (or diameter) `size`, centered in cell `(x, y)`.
fn emit_module(
    emitter: &mut Emitter,
    x: usize,
    y: usize,
    shape: ModuleShape,
    size: f64,
    fill: Color,
    opacity: f64,
) {
    let body = Rect::centered_in(Size::square(size), cell(x, y));
    let shape = match shape {
        ModuleShape::Rectangle => Shape::Rect {
            rect: body,
            corner_radius: 0.0,
            fill,
        },
        ModuleShape::RoundedRectangle => Shape::Rect {
            rect: body,
            corner_radius: size / 4.0,
            fill,
        },
        ModuleShape::Circle | ModuleShape::RandomRound => Shape::Circle {
            center: cell(x, y).center(),
            radius: size / 2.0,
            fill,
        },
    };
    emitter.push(shape, opacity);
}

fn emit_position_decoration(emitter: &mut Emitter, center: Point, position: &PositionParams) {
    match position.style {
        PositionStyle::Rectangle => {}
        PositionStyle::Round | PositionStyle::Planets => {
            emit_round_decoration(emitter, center, position)
        }
        PositionStyle::RoundedRectangle => {
            emitter.push(
                Shape::Circle {
                    center,
                    radius: CORE_RADIUS,
                    fill: position.dark,
                },
                1.0,
            );
            let half = FRAME_SIDE / 2.0;
            emitter.push(
                Shape::Frame {
                    rect: Rect::new(center.x - half, center.y - half, FRAME_SIDE, FRAME_SIDE),
                    corner_radius: FRAME_RADIUS,
                    stroke_width: position.size,
                    stroke: position.dark,
                },
                1.0,
            );
        }
        PositionStyle::Dsj => emit_dsj_decoration(emitter, center, position),
    }
}

fn emit_round_decoration(emitter: &mut Emitter, center: Point, position: &PositionParams) {
    emitter.push(
        Shape::Circle {
            center,
            radius: BACKING_RADIUS,
            fill: position.light,
        },
        1.0,
    );
    emitter.push(
        Shape::Circle {
            center,
            radius: CORE_RADIUS,
            fill: position.dark,
        },
        1.0,
    );
    emitter.push(
        Shape::Ring {
            center,
            radius: RING_RADIUS,
            stroke_width: position.size,
            dash: None,
            stroke: position.dark,
        },
        1.0,
    );
    if position.style != PositionStyle::Planets {
        return;
    }
    emitter.push(
        Shape::Ring {
            center,
            radius: RING_RADIUS,
            stroke_width: ORBIT_STROKE,
            dash: Some(ORBIT_DASH),
            stroke: position.dark,
        },
        1.0,
    );
    let satellites = [
        (RING_RADIUS, 0.0),
        (-RING_RADIUS, 0.0),
        (0.0, RING_RADIUS),
        (0.0, -RING_RADIUS),
    ];
    for (dx, dy) in satellites {
        emitter.push(
            Shape::Circle {
                center: center.offset(dx, dy),
                radius: 0.5 * position.size,
                fill: position.dark,
            },
            1.0,
        );
    }
}

/// A square of side `2 + size` on the center and a bar `size` thick three modules away on every
/// side, each bar as long as the square.
fn emit_dsj_decoration(emitter: &mut Emitter, center: Point, position: &PositionParams) {
    let thickness = position.size;
    let long = 2.0 + thickness;
    let inner = center.offset(-long / 2.0, -long / 2.0);
    let near = BAR_DISTANCE - thickness / 2.0;
    let parts = [
        Rect::new(inner.x, inner.y, long, long),
        Rect::new(center.x - near - thickness, inner.y, thickness, long),
        Rect::new(center.x + near, inner.y, thickness, long),
        Rect::new(inner.x, center.y - near - thickness, long, thickness),
        Rect::new(inner.x, center.y + near, long, thickness),
    ];
    for rect in parts {
        emitter.push(
            Shape::Rect {
                rect,
                corner_radius: 0.0,
                fill: position.dark,
            },
            1.0,
        );
    }
}

/// The background, the watermark and the mask tint, each covering the canvas and shown through
/// the dark modules only.
fn emit_image_fill(
    emitter: &mut Emitter,
    grid: &ModuleGrid,
    canvas: Rect,
    params: &ImageFillParams,
    watermark: Option<&WatermarkDescriptor>,
) -> Result<ModuleMask, Error> {
    let start = emitter.len();
    emitter.push(
        Shape::Rect {
            rect: canvas,
            corner_radius: 0.0,
            fill: params.background,
        },
        1.0,
    );
    if let Some(watermark) = watermark {
        emit_watermark(emitter, canvas, watermark)?;
    }
    emitter.push(
        Shape::Rect {
            rect: canvas,
            corner_radius: 0.0,
            fill: params.mask,
        },
        1.0,
    );
    Ok(ModuleMask {
        modules: grid.clone(),
        primitives: start..emitter.len(),
    })
}

fn tint_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Dark modules as two overlapping squares, a darker one under a tinted one, both randomly
/// enlarged around the module. Modules are visited in an order shuffled by the seed.
fn emit_random_rectangles(
    emitter: &mut Emitter,
    grid: &ModuleGrid,
    params: &RandomRectangleParams,
) {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let size = grid.size();
    let mut cells: Vec<(usize, usize)> = iproduct!(0..size, 0..size).collect();
    cells.shuffle(&mut rng);

    let base = params.color;
    let alpha = base.alpha();
    for (y, x) in cells {
        if !grid.is_dark(x, y) {
            continue;
        }
        let jitter: f64 = rng.gen_range(0.8..=1.3);
        let tint: f64 = rng.gen_range(50.0..=230.0);
        let channels = [
            base.r as f64 + tint,
            base.g as f64 - tint / 2.0,
            base.b as f64 + tint * 2.0,
        ];
        let [r, g, b] = channels.map(tint_channel);
        let fill = Color::rgb(r, g, b);
        let [r, g, b] = channels.map(|channel| tint_channel(channel - SHADOW_OFFSET));
        let shadow = Color::rgb(r, g, b);
        let shift = (jitter - 1.0) / 2.0;
        let origin_x = x as f64 - shift;
        let origin_y = y as f64 - shift;
        emitter.push(
            Shape::Rect {
                rect: Rect::new(origin_x, origin_y, jitter + 0.15, jitter + 0.15),
                corner_radius: 0.0,
                fill: shadow,
            },
            0.9 * alpha,
        );
        emitter.push(
            Shape::Rect {
                rect: Rect::new(origin_x, origin_y, jitter, jitter),
                corner_radius: 0.0,
                fill,
            },
            alpha,
        );
    }
}

#[cfg(test)]
mod test {
    use qrstyle_core::{Module, Version};

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{DrawPrimitive, ImageMode, ImagePayload};

    fn count_shapes(primitives: &[DrawPrimitive], kind: fn(&Shape) -> bool) -> usize {
        primitives.iter().filter(|p| kind(&p.shape)).count()
    }

    fn version_2() -> (ModuleGrid, RoleTable) {
        let roles = RoleTable::new(Version::new(2).unwrap(), 0);
        // Dark wherever the standard puts dark finder modules, light elsewhere.
        let mut grid = ModuleGrid::filled(25, Module::Light);
        for (ox, oy) in [(0, 0), (18, 0), (0, 18)] {
            for (dx, dy) in iproduct!(0..7usize, 0..7usize) {
                let ring = dx.min(dy).min(6 - dx).min(6 - dy);
                if ring != 1 {
                    grid.set(ox + dx, oy + dy, Module::Dark);
                }
            }
        }
        (grid, roles)
    }

    fn basic(params: BasicParams) -> StyleConfig {
        StyleConfig::new(StyleKind::Basic(params))
    }

    #[test]
    fn test_ids_are_sequential() {
        let (grid, roles) = version_2();
        let style = basic(BasicParams::default().with_position(PositionStyle::Planets));
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert!(drawing
            .primitives
            .iter()
            .enumerate()
            .all(|(index, p)| p.id == index));
    }

    #[test]
    fn test_rectangle_position_colors_finder_modules() {
        let (grid, roles) = version_2();
        let mut params = BasicParams::default();
        params.position.dark = Color::rgb(200, 0, 0);
        let style = basic(params);
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        // Row-major: the first primitive is module (0, 0), a dark finder module.
        let Shape::Rect { rect, fill, .. } = drawing.primitives[0].shape else {
            panic!("expected a rect");
        };
        assert_eq!(rect, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(fill, Color::rgb(200, 0, 0));
        // Module (1, 1) is on the light ring of the finder.
        let Shape::Rect { fill, .. } = drawing.primitives[25 + 1].shape else {
            panic!("expected a rect");
        };
        assert_eq!(fill, Color::WHITE);
    }

    #[test]
    fn test_round_decoration_comes_first_and_absorbs_finders() {
        let (grid, roles) = version_2();
        let style = basic(BasicParams::default().with_position(PositionStyle::Round));
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert_eq!(drawing.primitives.len(), 625 - 3 * 64 + 3 * 3);
        let Shape::Circle { center, radius, .. } = drawing.primitives[0].shape else {
            panic!("expected the backing disk");
        };
        assert_eq!(center, Point::new(3.5, 3.5));
        assert_eq!(radius, 5.0);
        let Shape::Ring { radius, dash, .. } = drawing.primitives[2].shape else {
            panic!("expected the ring");
        };
        assert_eq!((radius, dash), (3.0, None));
    }

    #[test]
    fn test_planets_satellites() {
        let (grid, roles) = version_2();
        let style = basic(BasicParams::default().with_position(PositionStyle::Planets));
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert_eq!(drawing.primitives.len(), 625 - 3 * 64 + 3 * 8);
        let dashed = count_shapes(&drawing.primitives, |s| {
            matches!(s, Shape::Ring { dash: Some(_), .. })
        });
        assert_eq!(dashed, 3);
        let satellites: Vec<Point> = drawing.primitives[4..8]
            .iter()
            .map(|p| match p.shape {
                Shape::Circle { center, radius, .. } => {
                    assert_eq!(radius, 0.5);
                    center
                }
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert!(satellites.contains(&Point::new(6.5, 3.5)));
        assert!(satellites.contains(&Point::new(3.5, 0.5)));
    }

    #[test]
    fn test_full_cell_treatments_ignore_scale() {
        let (grid, roles) = version_2();
        let params = BasicParams::default()
            .with_scale(0.5)
            .with_timing(PatternTreatment::FullCell);
        let style = basic(params);
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        // (8, 6) is on the timing row, (8, 8) is data.
        let at = |x: usize, y: usize| drawing.primitives[y * 25 + x].shape;
        assert!(matches!(at(8, 6), Shape::Rect { rect, .. } if rect == cell(8, 6)));
        assert!(matches!(
            at(8, 8),
            Shape::Rect { rect, .. } if rect == Rect::new(8.25, 8.25, 0.5, 0.5)
        ));
        // Alignment still inherits the data shape.
        assert!(matches!(
            at(18, 18),
            Shape::Rect { rect, .. } if rect.width() == 0.5
        ));
    }

    #[test]
    fn test_full_cell_alignment_ignores_scale() {
        let (grid, roles) = version_2();
        let params = BasicParams::default()
            .with_scale(0.5)
            .with_alignment(PatternTreatment::FullCell);
        let style = basic(params);
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        let at = |x: usize, y: usize| drawing.primitives[y * 25 + x].shape;
        // (18, 18) is the alignment center of version 2.
        for (x, y) in [(18, 18), (16, 16), (20, 17)] {
            assert!(matches!(
                at(x, y),
                Shape::Rect { rect, corner_radius, .. }
                    if rect == cell(x, y) && corner_radius == 0.0
            ));
        }
        // Timing still inherits the data shape.
        assert!(matches!(
            at(8, 6),
            Shape::Rect { rect, .. } if rect == Rect::new(8.25, 6.25, 0.5, 0.5)
        ));
    }

    #[test]
    fn test_shaped_patterns_use_their_size_and_color() {
        let (mut grid, roles) = version_2();
        grid.set(8, 6, Module::Dark);
        grid.set(18, 18, Module::Dark);
        let red = Color::rgb(220, 0, 0);
        let params = BasicParams::default()
            .with_scale(0.9)
            .with_timing_params(
                PatternParams::new(PatternTreatment::Round)
                    .with_size(0.6)
                    .with_dark(red),
            )
            .with_alignment_params(
                PatternParams::new(PatternTreatment::RoundedRectangle).with_size(0.8),
            );
        let style = basic(params);
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        let at = |x: usize, y: usize| drawing.primitives[y * 25 + x].shape;
        let Shape::Circle { center, radius, fill } = at(8, 6) else {
            panic!("expected a round timing module");
        };
        assert_eq!(center, Point::new(8.5, 6.5));
        assert_abs_diff_eq!(radius, 0.3, epsilon = 1e-12);
        assert_eq!(fill, red);
        // Light timing modules keep the light data color.
        assert!(matches!(at(9, 6), Shape::Circle { fill, .. } if fill == Color::WHITE));
        let Shape::Rect { rect, corner_radius, fill } = at(18, 18) else {
            panic!("expected a rounded alignment module");
        };
        assert_abs_diff_eq!(rect.width(), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(rect.center().x, 18.5, epsilon = 1e-12);
        assert_abs_diff_eq!(rect.center().y, 18.5, epsilon = 1e-12);
        assert_abs_diff_eq!(corner_radius, 0.2, epsilon = 1e-12);
        assert_eq!(fill, Color::BLACK);

        let squares = BasicParams::default()
            .with_timing_params(PatternParams::new(PatternTreatment::Rectangle).with_size(0.5));
        let style = basic(squares);
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert!(matches!(
            drawing.primitives[6 * 25 + 8].shape,
            Shape::Rect { rect, corner_radius, .. }
                if rect == Rect::new(8.25, 6.25, 0.5, 0.5) && corner_radius == 0.0
        ));
    }

    #[test]
    fn test_random_round_modules_are_seeded() {
        let (grid, roles) = version_2();
        let seeded = |seed| {
            basic(
                BasicParams::default()
                    .with_shape(ModuleShape::RandomRound)
                    .with_scale(0.9)
                    .with_seed(seed),
            )
        };
        let (a, b) = (seeded(5), seeded(6));
        let first = render(&grid, &roles, &a, Ecl::M).unwrap();
        let again = render(&grid, &roles, &a, Ecl::M).unwrap();
        let other = render(&grid, &roles, &b, Ecl::M).unwrap();
        assert_eq!(first.primitives, again.primitives);
        assert_ne!(first.primitives, other.primitives);
        let radii: Vec<f64> = first
            .primitives
            .iter()
            .filter_map(|p| match p.shape {
                Shape::Circle { radius, .. } => Some(radius),
                _ => None,
            })
            .collect();
        // Every module outside the finder blocks is a circle.
        assert_eq!(radii.len(), 625 - 3 * 64);
        assert!(radii
            .iter()
            .all(|&r| (0.9 * 0.33 / 2.0..0.9 / 2.0).contains(&r)));
        assert!(radii.iter().any(|&r| r != radii[0]));
    }

    #[test]
    fn test_rounded_rectangle_decoration() {
        let (grid, roles) = version_2();
        let style = basic(BasicParams::default().with_position(PositionStyle::RoundedRectangle));
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert_eq!(drawing.primitives.len(), 625 - 3 * 64 + 3 * 2);
        assert!(matches!(
            drawing.primitives[0].shape,
            Shape::Circle { center, radius, .. } if center == Point::new(3.5, 3.5) && radius == 1.5
        ));
        let Shape::Frame { rect, corner_radius, stroke_width, .. } = drawing.primitives[1].shape
        else {
            panic!("expected the outline");
        };
        assert_eq!(rect, Rect::new(0.5, 0.5, 6.0, 6.0));
        assert_eq!(stroke_width, 1.0);
        assert!(corner_radius > 0.0 && corner_radius < 3.0);
    }

    #[test]
    fn test_dsj_decoration() {
        let (grid, roles) = version_2();
        let style = basic(BasicParams::default().with_position(PositionStyle::Dsj));
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert_eq!(drawing.primitives.len(), 625 - 3 * 64 + 3 * 5);
        let rects: Vec<Rect> = drawing.primitives[..5]
            .iter()
            .map(|p| match p.shape {
                Shape::Rect { rect, .. } => rect,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(2.0, 2.0, 3.0, 3.0),
                Rect::new(0.0, 2.0, 1.0, 3.0),
                Rect::new(6.0, 2.0, 1.0, 3.0),
                Rect::new(2.0, 0.0, 3.0, 1.0),
                Rect::new(2.0, 6.0, 3.0, 1.0),
            ]
        );
        // The top right finder is centered on (21.5, 3.5).
        assert!(matches!(
            drawing.primitives[5].shape,
            Shape::Rect { rect, .. } if rect == Rect::new(20.0, 2.0, 3.0, 3.0)
        ));
    }

    #[test]
    fn test_image_fill_masks_its_layers() {
        let (grid, roles) = version_2();
        let watermark =
            WatermarkDescriptor::new(image::RgbaImage::new(5, 5)).with_shrunk_modules(true);
        let style = StyleConfig::new(StyleKind::ImageFill(ImageFillParams::default()))
            .with_watermark(watermark)
            .with_icon(IconDescriptor::new(image::RgbaImage::new(2, 2)));
        assert!(!style.requires_thirds());
        let drawing = render(&grid, &roles, &style, Ecl::H).unwrap();
        assert_eq!(drawing.primitives.len(), 3 + 2);
        let canvas = Rect::new(0.0, 0.0, 25.0, 25.0);
        assert!(matches!(
            drawing.primitives[0].shape,
            Shape::Rect { rect, fill, .. } if rect == canvas && fill == Color::WHITE
        ));
        assert!(matches!(
            drawing.primitives[1].shape,
            Shape::Image { slot: ImageSlot::Watermark, clip, .. } if clip == canvas
        ));
        assert!(matches!(
            drawing.primitives[2].shape,
            Shape::Rect { fill, .. } if fill == Color::rgba(0, 0, 0, 0.1)
        ));
        let mask = drawing.mask.as_ref().unwrap();
        assert_eq!(mask.primitives, 0..3);
        assert_eq!(mask.modules, grid);
        assert!(!mask.applies_to(3));

        let bare = StyleConfig::new(StyleKind::ImageFill(ImageFillParams::default()));
        let drawing = render(&grid, &roles, &bare, Ecl::H).unwrap();
        assert_eq!(drawing.primitives.len(), 2);
        assert_eq!(drawing.mask.unwrap().primitives, 0..2);
    }

    #[test]
    fn test_empty_animations_are_rejected() {
        let (grid, roles) = version_2();
        let empty = ImagePayload::Animated {
            frames: vec![],
            delays: vec![],
        };
        let style = StyleConfig::default().with_watermark(WatermarkDescriptor::new(empty.clone()));
        assert!(matches!(
            render(&grid, &roles, &style, Ecl::M),
            Err(Error::InvalidGeometry(_))
        ));
        let style = StyleConfig::default().with_icon(IconDescriptor::new(empty));
        assert!(matches!(
            render(&grid, &roles, &style, Ecl::M),
            Err(Error::InvalidGeometry(_))
        ));
        let mismatched = ImagePayload::Animated {
            frames: vec![image::RgbaImage::new(2, 2)],
            delays: vec![],
        };
        let style = StyleConfig::new(StyleKind::ImageFill(ImageFillParams::default()))
            .with_watermark(WatermarkDescriptor::new(mismatched));
        assert!(matches!(
            render(&grid, &roles, &style, Ecl::M),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_circle_and_rounded_shapes() {
        let (grid, roles) = version_2();
        let circles = basic(BasicParams::default().with_shape(ModuleShape::Circle).with_scale(0.8));
        let drawing = render(&grid, &roles, &circles, Ecl::M).unwrap();
        assert!(matches!(
            drawing.primitives[8 * 25 + 8].shape,
            Shape::Circle { radius, center, .. } if radius == 0.4 && center == Point::new(8.5, 8.5)
        ));
        let rounded = basic(BasicParams::default().with_shape(ModuleShape::RoundedRectangle));
        let drawing = render(&grid, &roles, &rounded, Ecl::M).unwrap();
        assert!(matches!(
            drawing.primitives[8 * 25 + 8].shape,
            Shape::Rect { corner_radius, .. } if corner_radius == 0.25
        ));
    }

    #[test]
    fn test_watermark_is_first_and_shrinks_modules() {
        let (grid, roles) = version_2();
        let watermark = WatermarkDescriptor::new(image::RgbaImage::new(50, 25))
            .with_mode(ImageMode::ScaleAspectFit)
            .with_shrunk_modules(true);
        let style = basic(BasicParams::default()).with_watermark(watermark);
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        assert_eq!(drawing.primitives.len(), 626);
        let first = drawing.primitives[0];
        assert_eq!(first.id, 0);
        assert!(matches!(
            first.shape,
            Shape::Image { slot: ImageSlot::Watermark, placement, clip, .. }
                if placement == Rect::new(0.0, 6.25, 25.0, 12.5)
                    && clip == Rect::new(0.0, 0.0, 25.0, 25.0)
        ));
        let Shape::Rect { rect, .. } = drawing.primitives[1 + 8 * 25 + 8].shape else {
            panic!("expected a rect");
        };
        assert!((rect.width() - 1.0 / 3.0).abs() < 1e-12);
        assert!(drawing.watermark.is_some());
    }

    #[test]
    fn test_icon_is_clamped_by_correction_level() {
        let grid = ModuleGrid::filled(25, Module::Light);
        let roles = RoleTable::new(Version::new(2).unwrap(), 0);
        let icon = IconDescriptor::new(ImagePayload::Static(image::RgbaImage::new(10, 10)))
            .with_percentage(0.9);
        let style = StyleConfig::default().with_icon(icon);
        let drawing = render(&grid, &roles, &style, Ecl::L).unwrap();
        let last = drawing.primitives.last().unwrap();
        let Shape::Image { slot, clip, placement, .. } = last.shape else {
            panic!("expected the icon");
        };
        assert_eq!(slot, ImageSlot::Icon);
        assert!(clip.width() <= 25.0 * 0.07 + 1e-9);
        assert!((placement.width() - clip.width()).abs() < 1e-9);
        assert!((placement.min_x() - clip.min_x()).abs() < 1e-9);
        let backing = drawing.primitives[drawing.primitives.len() - 2];
        assert!(matches!(
            backing.shape,
            Shape::Rect { rect, .. } if rect.width() <= 25.0 * 0.07 + 1e-9
        ));
    }

    #[test]
    fn test_invalid_style_is_rejected_without_output() {
        let (grid, roles) = version_2();
        for params in [
            BasicParams::default().with_scale(0.0),
            BasicParams::default().with_scale(1.5),
            BasicParams::default().with_opacity(-0.1),
            BasicParams::default()
                .with_timing_params(PatternParams::new(PatternTreatment::Round).with_size(0.0)),
            BasicParams::default().with_alignment_params(
                PatternParams::new(PatternTreatment::Rectangle).with_size(1.2),
            ),
        ] {
            assert!(matches!(
                render(&grid, &roles, &basic(params), Ecl::M),
                Err(Error::InvalidGeometry(_))
            ));
        }
        let empty = WatermarkDescriptor::new(image::RgbaImage::new(0, 0));
        let style = StyleConfig::default().with_watermark(empty);
        assert!(render(&grid, &roles, &style, Ecl::M).is_err());
        let other_roles = RoleTable::new(Version::MIN, 0);
        assert!(render(&grid, &other_roles, &StyleConfig::default(), Ecl::M).is_err());
    }

    #[test]
    fn test_random_rectangles_are_seeded() {
        let (grid, roles) = version_2();
        let seeded = |seed| {
            StyleConfig::new(StyleKind::RandomRectangle(RandomRectangleParams {
                seed,
                ..Default::default()
            }))
        };
        let a = seeded(1);
        let b = seeded(2);
        let first = render(&grid, &roles, &a, Ecl::M).unwrap();
        let again = render(&grid, &roles, &a, Ecl::M).unwrap();
        let other = render(&grid, &roles, &b, Ecl::M).unwrap();
        assert_eq!(first.primitives, again.primitives);
        assert_ne!(first.primitives, other.primitives);
        assert_eq!(first.primitives.len(), 2 * grid.count_dark());
        for pair in first.primitives.chunks(2) {
            let (Shape::Rect { rect: shadow, fill: dark, .. }, Shape::Rect { rect, fill, .. }) =
                (pair[0].shape, pair[1].shape)
            else {
                panic!("expected two rects");
            };
            assert_eq!(shadow.origin, rect.origin);
            assert!((shadow.width() - rect.width() - 0.15).abs() < 1e-12);
            assert!((0.8..=1.3).contains(&rect.width()));
            // Red and green never reach the clamp bounds for the default tint.
            assert_eq!((dark.r, dark.g), (fill.r - 40, fill.g - 40));
            assert!(dark.b >= fill.b.saturating_sub(40));
        }
    }

    #[test]
    fn test_random_rectangle_shadow_is_clamped_after_offset() {
        let (grid, roles) = version_2();
        let style = StyleConfig::new(StyleKind::RandomRectangle(RandomRectangleParams::default()));
        let drawing = render(&grid, &roles, &style, Ecl::M).unwrap();
        let mut saturated = 0;
        for pair in drawing.primitives.chunks(2) {
            let (Shape::Rect { fill: shadow, .. }, Shape::Rect { fill, .. }) =
                (pair[0].shape, pair[1].shape)
            else {
                panic!("expected two rects");
            };
            // Blue is 60 + 2 * tint: past 295 both squares saturate, the shadow included.
            if shadow.b == 255 {
                assert_eq!(fill.b, 255);
                saturated += 1;
            }
        }
        assert!(saturated > 0);
    }
}
