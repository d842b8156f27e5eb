//! Diagram layout
//!
//! A diagram is described as a tree of [`LayoutNode`]s (what to draw, how tall,
//! which metric colors it) and turned into a flat list of positioned
//! [`DiagramNode`]s by [`LayoutEngine`]. Nodes are emitted in painting order:
//! a container always precedes its children.
//!
//! Vertical extents are either fixed or a fraction of the parent's inner
//! height. Boxes with a LEFT or BOTTOM label measure the label first, reserve
//! `extent * (1 + padding_ratio)` for it and shrink the rectangle accordingly;
//! INSIDE labels reserve nothing.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Point2, Rotation2, Vector2};

use super::config::DiagramConfig;
use super::input::{MetricBinding, RegionValues};
use super::swatch::swatch_cells;
use super::text::{layout_text, TextAlign, TextBlock, TextMeasure};
use crate::color::{bin_lower_bound, Rgb, BIN_COUNT};
use crate::measure::metrics::{MemoryLevel, MetricKind, Traffic};
use crate::saturation::scale_ratio;

// =================================================================================================
// Geometry
// =================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shrink by `padding` on every side
    pub fn inset(&self, padding: f64) -> Self {
        Self::new(
            self.x + padding,
            self.y + padding,
            (self.width - 2.0 * padding).max(0.0),
            (self.height - 2.0 * padding).max(0.0),
        )
    }
}

/// Where a component's label goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPosition {
    /// Centered on the box, drawn over the fill
    #[default]
    Inside,
    /// Rotated strip to the left of the box
    Left,
    /// Strip below the box
    Bottom,
}

/// Direction an arrow points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Outline of an arrow filling `bounds` and pointing in `direction`
///
/// The arrow is defined once, pointing down from the origin, and rotated about
/// its start point into the other directions. The head is `head_width_ratio`
/// times as wide as the shaft and takes `head_length_ratio` of the length.
pub fn arrow_outline(
    bounds: Bounds,
    direction: Direction,
    head_width_ratio: f64,
    head_length_ratio: f64,
) -> Vec<(f64, f64)> {
    let Bounds { x, y, width, height } = bounds;
    let (origin, angle, w, h) = match direction {
        Direction::Down => (Point2::new(x, y), 0.0, width, height),
        Direction::Up => (Point2::new(x + width, y + height), PI, width, height),
        Direction::Left => (Point2::new(x + width, y), FRAC_PI_2, height, width),
        Direction::Right => (Point2::new(x, y + height), -FRAC_PI_2, height, width),
    };

    let shaft = h * (1.0 - head_length_ratio);
    let head_width = w * head_width_ratio;
    let ledge = (head_width - w) / 2.0;

    let local = [
        Vector2::new(0.0, 0.0),
        Vector2::new(w, 0.0),
        Vector2::new(w, shaft),
        Vector2::new(w + ledge, shaft),
        Vector2::new(w / 2.0, h),
        Vector2::new(-ledge, shaft),
        Vector2::new(0.0, shaft),
    ];

    let rotation = Rotation2::new(angle);
    local
        .iter()
        .map(|v| {
            let p = origin + rotation * *v;
            (p.x, p.y)
        })
        .collect()
}

// =================================================================================================
// Output nodes
// =================================================================================================

/// How a node is filled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Solid(Rgb),
    /// Bound metric was not measured; drawn with the neutral placeholder color
    Neutral,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Rect,
    Arrow(Direction),
    Text,
}

/// Measured text with its final placement
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub block: TextBlock,
    /// Area the text occupies (for rotated text, width is the stacked line thickness)
    pub bounds: Bounds,
    pub align: TextAlign,
    /// Rotated a quarter turn counter-clockwise (reads bottom to top)
    pub rotated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    pub kind: NodeKind,
    pub bounds: Bounds,
    pub fill: Fill,
    /// `0` draws no outline
    pub stroke_width: f64,
    pub binding: Option<MetricBinding>,
    pub label: Option<PlacedText>,
}

impl DiagramNode {
    fn text(label: PlacedText) -> Self {
        Self {
            kind: NodeKind::Text,
            bounds: label.bounds,
            fill: Fill::None,
            stroke_width: 0.0,
            binding: None,
            label: Some(label),
        }
    }

    /// Label with wrapped lines joined by spaces
    pub fn label_text(&self) -> Option<String> {
        self.label.as_ref().map(|l| l.block.lines.join(" "))
    }
}

/// Positioned nodes of one diagram, in painting order
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<DiagramNode>,
}

impl Diagram {
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn arrows(&self) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.iter().filter(|n| matches!(n.kind, NodeKind::Arrow(_)))
    }

    /// Nodes drawn with the neutral placeholder
    pub fn neutral_nodes(&self) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.iter().filter(|n| n.fill == Fill::Neutral)
    }

    /// Nodes colored by a metric
    pub fn bound_nodes(&self) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.iter().filter(|n| n.binding.is_some())
    }

    /// First non-text node labelled `label`
    pub fn component(&self, label: &str) -> Option<&DiagramNode> {
        self.nodes
            .iter()
            .filter(|n| n.kind != NodeKind::Text)
            .find(|n| n.label_text().as_deref() == Some(label))
    }
}

// =================================================================================================
// Layout tree
// =================================================================================================

/// Vertical size of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extent {
    Fixed(f64),
    /// Fraction of the parent's inner height
    Fraction(f64),
}

impl Extent {
    fn resolve(&self, available: f64) -> f64 {
        match self {
            Extent::Fixed(h) => *h,
            Extent::Fraction(f) => available * f,
        }
    }
}

/// A labelled box, optionally colored by one metric
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub label: String,
    pub binding: Option<MetricBinding>,
    pub label_position: LabelPosition,
    pub font_size: f64,
    pub stroke_width: f64,
}

impl Component {
    pub fn new(label: impl Into<String>, font_size: f64, stroke_width: f64) -> Self {
        Self {
            label: label.into(),
            binding: None,
            label_position: LabelPosition::Inside,
            font_size,
            stroke_width,
        }
    }

    pub fn bound_to(mut self, binding: MetricBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn label_at(mut self, position: LabelPosition) -> Self {
        self.label_position = position;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    /// Full-width wrapped text
    Text {
        text: String,
        font_size: f64,
        align: TextAlign,
        gap_after: f64,
    },
    /// Color swatch, rotated tick labels and caption
    Legend { caption: String, gap_after: f64 },
    /// Full-width box; children are stacked inside it
    Box {
        component: Component,
        height: Extent,
        padding: f64,
        children: Vec<LayoutNode>,
    },
    /// Children side by side with equal widths
    Row {
        height: Extent,
        children: Vec<LayoutNode>,
    },
    /// Load arrow (down) and store arrow (up) between two levels
    Transfer {
        load: Option<MetricBinding>,
        store: Option<MetricBinding>,
        height: Extent,
    },
}

impl LayoutNode {
    pub fn component(component: Component, height: Extent) -> Self {
        LayoutNode::Box {
            component,
            height,
            padding: 0.0,
            children: Vec::new(),
        }
    }
}

/// Bindings of one memory level: the box, its load arrow and its store arrow
fn level_bindings(level: MemoryLevel) -> [MetricBinding; 3] {
    [Traffic::Total, Traffic::Load, Traffic::Store]
        .map(|traffic| MetricBinding::saturation(MetricKind::bandwidth(level, traffic)))
}

/// The overview template: title, description, legend, then RAM down to the core
pub fn overview_template(
    region: &str,
    description: String,
    ports: u8,
    config: &DiagramConfig,
) -> Vec<LayoutNode> {
    let big = config.big_label_font;
    let small = config.small_label_font;
    let stroke = config.stroke_width;
    let thin = config.thin_stroke_width;

    let memory_box = |label: &str, binding: Option<MetricBinding>, height: f64| {
        let mut component = Component::new(label, big, stroke);
        component.binding = binding;
        LayoutNode::component(component, Extent::Fixed(height))
    };
    let transfer = |level: MemoryLevel| {
        let [_, load, store] = level_bindings(level);
        LayoutNode::Transfer {
            load: Some(load),
            store: Some(store),
            height: Extent::Fixed(config.transfer_arrow_height),
        }
    };

    let [ram, ..] = level_bindings(MemoryLevel::Ram);
    let [l3, ..] = level_bindings(MemoryLevel::L3);
    let [l2, ..] = level_bindings(MemoryLevel::L2);

    let flops = LayoutNode::Row {
        height: Extent::Fraction(2.0 / 3.0),
        children: vec![
            LayoutNode::component(
                Component::new("Single-precision FLOP/s", big, stroke)
                    .bound_to(MetricBinding::saturation(MetricKind::SpFlopRate)),
                Extent::Fraction(1.0),
            ),
            LayoutNode::component(
                Component::new("Double-precision FLOP/s", big, stroke)
                    .bound_to(MetricBinding::saturation(MetricKind::DpFlopRate)),
                Extent::Fraction(1.0),
            ),
        ],
    };

    let port_row = LayoutNode::Row {
        height: Extent::Fraction(1.0 / 3.0),
        children: (0..ports)
            .map(|port| {
                LayoutNode::component(
                    Component::new(format!("Port {port}"), small, thin)
                        .bound_to(MetricBinding::geometric_mean(MetricKind::PortUsage(port))),
                    Extent::Fraction(1.0),
                )
            })
            .collect(),
    };

    let in_core = LayoutNode::Box {
        component: Component::new("In-core performance", big, stroke).label_at(LabelPosition::Left),
        height: Extent::Fraction(1.0),
        padding: 0.0,
        children: vec![flops, port_row],
    };

    vec![
        LayoutNode::Text {
            text: format!("Saturation diagram for region\n\"{region}\""),
            font_size: config.title_font,
            align: TextAlign::Center,
            gap_after: config.large_internal_margin,
        },
        LayoutNode::Text {
            text: description,
            font_size: config.description_font,
            align: TextAlign::Left,
            gap_after: config.internal_margin,
        },
        LayoutNode::Legend {
            caption: "Saturation level (higher is usually better)".to_string(),
            gap_after: config.internal_margin,
        },
        memory_box("RAM", Some(ram), config.ram_height),
        transfer(MemoryLevel::Ram),
        memory_box("L3 Cache", Some(l3), config.cache_height),
        transfer(MemoryLevel::L3),
        memory_box("L2 Cache", Some(l2), config.cache_height),
        transfer(MemoryLevel::L2),
        memory_box("L1 Cache", None, config.cache_height),
        LayoutNode::Box {
            component: Component::new("", big, stroke),
            height: Extent::Fixed(config.core_height),
            padding: config.internal_margin,
            children: vec![in_core],
        },
    ]
}

// =================================================================================================
// Layout engine
// =================================================================================================

/// Walks a layout tree and positions every node
pub struct LayoutEngine<'a> {
    config: &'a DiagramConfig,
    measure: &'a dyn TextMeasure,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a DiagramConfig, measure: &'a dyn TextMeasure) -> Self {
        Self { config, measure }
    }

    /// Position `tree` inside the page margins, coloring bound nodes from `values`
    pub fn layout(&self, tree: &[LayoutNode], values: &RegionValues) -> Diagram {
        let c = self.config;
        let area = Bounds::new(
            c.margin_x,
            c.margin_y,
            c.content_width(),
            f64::from(c.height) - 2.0 * c.margin_y,
        );

        let mut nodes = Vec::new();
        self.stack(tree, area, values, &mut nodes);

        Diagram {
            width: c.width,
            height: c.height,
            nodes,
        }
    }

    /// Stack `children` top to bottom inside `area`; returns the height used
    fn stack(&self, children: &[LayoutNode], area: Bounds, values: &RegionValues, out: &mut Vec<DiagramNode>) -> f64 {
        let mut y = area.y;
        for child in children {
            let slot = Bounds::new(area.x, y, area.width, area.height);
            y += self.place(child, slot, values, out);
        }
        y - area.y
    }

    /// Place one node at the top of `slot`; `slot.height` is the parent's inner height
    fn place(&self, node: &LayoutNode, slot: Bounds, values: &RegionValues, out: &mut Vec<DiagramNode>) -> f64 {
        match node {
            LayoutNode::Text {
                text,
                font_size,
                align,
                gap_after,
            } => {
                let block = self.text_block(text, *font_size, slot.width);
                let height = block.height;
                out.push(DiagramNode::text(PlacedText {
                    bounds: Bounds::new(slot.x, slot.y, slot.width, height),
                    block,
                    align: *align,
                    rotated: false,
                }));
                height + gap_after
            }

            LayoutNode::Legend { caption, gap_after } => self.legend(caption, slot, out) + gap_after,

            LayoutNode::Box {
                component,
                height,
                padding,
                children,
            } => {
                let outer = Bounds::new(slot.x, slot.y, slot.width, height.resolve(slot.height));
                let rect = self.component(component, outer, values, out);
                if !children.is_empty() {
                    self.stack(children, rect.inset(*padding), values, out);
                }
                outer.height
            }

            LayoutNode::Row { height, children } => {
                let h = height.resolve(slot.height);
                if !children.is_empty() {
                    let w = slot.width / children.len() as f64;
                    for (i, child) in children.iter().enumerate() {
                        let cell = Bounds::new(slot.x + i as f64 * w, slot.y, w, h);
                        self.place(child, cell, values, out);
                    }
                }
                h
            }

            LayoutNode::Transfer { load, store, height } => {
                let h = height.resolve(slot.height);
                let w = slot.width / 5.0;
                let arrows = [
                    (slot.x + w, *load, Direction::Down, "load"),
                    (slot.x + 3.0 * w, *store, Direction::Up, "store"),
                ];
                for (x, binding, direction, label) in arrows {
                    let bounds = Bounds::new(x, slot.y, w, h);
                    let block = self.text_block(label, self.config.small_label_font, w);
                    out.push(DiagramNode {
                        kind: NodeKind::Arrow(direction),
                        bounds,
                        fill: self.fill_for(binding, values),
                        stroke_width: self.config.thin_stroke_width,
                        binding,
                        label: Some(centered(block, bounds)),
                    });
                }
                h
            }
        }
    }

    /// Emit a component box; returns the rectangle left after label reservation
    fn component(&self, component: &Component, outer: Bounds, values: &RegionValues, out: &mut Vec<DiagramNode>) -> Bounds {
        let c = self.config;
        let has_label = !component.label.is_empty();

        let (rect, label) = match component.label_position {
            LabelPosition::Inside => {
                let label = has_label.then(|| {
                    centered(self.text_block(&component.label, component.font_size, outer.width), outer)
                });
                (outer, label)
            }
            LabelPosition::Left => {
                // rotated: lines wrap along the box height
                let block = self.text_block(&component.label, component.font_size, outer.height);
                let thickness = if has_label { block.height } else { 0.0 };
                let reserved = thickness * (1.0 + c.padding_ratio_left);
                let rect = Bounds::new(outer.x + reserved, outer.y, (outer.width - reserved).max(0.0), outer.height);
                let label = has_label.then(|| PlacedText {
                    bounds: Bounds::new(outer.x, outer.y, thickness, outer.height),
                    block,
                    align: TextAlign::Center,
                    rotated: true,
                });
                (rect, label)
            }
            LabelPosition::Bottom => {
                let block = self.text_block(&component.label, component.font_size, outer.width);
                let thickness = if has_label { block.height } else { 0.0 };
                let reserved = thickness * (1.0 + c.padding_ratio_bottom);
                let rect = Bounds::new(outer.x, outer.y, outer.width, (outer.height - reserved).max(0.0));
                let label = has_label.then(|| PlacedText {
                    bounds: Bounds::new(outer.x, outer.bottom() - thickness, outer.width, thickness),
                    block,
                    align: TextAlign::Center,
                    rotated: false,
                });
                (rect, label)
            }
        };

        out.push(DiagramNode {
            kind: NodeKind::Rect,
            bounds: rect,
            fill: self.fill_for(component.binding, values),
            stroke_width: component.stroke_width,
            binding: component.binding,
            label,
        });
        rect
    }

    /// Swatch, tick labels and caption; returns the height used
    fn legend(&self, caption: &str, slot: Bounds, out: &mut Vec<DiagramNode>) -> f64 {
        let c = self.config;
        let swatch = Bounds::new(slot.x, slot.y, slot.width, c.swatch_height);

        for (i, cell) in swatch_cells(swatch, BIN_COUNT).into_iter().enumerate() {
            out.push(DiagramNode {
                kind: NodeKind::Rect,
                bounds: cell,
                fill: Fill::Solid(c.color_scale.color(bin_lower_bound(i))),
                stroke_width: 0.0,
                binding: None,
                label: None,
            });
        }

        let ticks_y = slot.y + c.swatch_height + c.small_internal_margin;
        let mut tick_length: f64 = 0.0;
        for i in 0..=BIN_COUNT {
            let value = i as f64 / BIN_COUNT as f64;
            let block = self.text_block(&format!("{value:.1}"), c.description_font, c.legend_item_width);
            tick_length = tick_length.max(block.width);
            let x = slot.x + c.legend_offset + scale_ratio(value) * slot.width;
            out.push(DiagramNode::text(PlacedText {
                bounds: Bounds::new(x, ticks_y, block.height, c.legend_item_width),
                block,
                align: TextAlign::Right,
                rotated: true,
            }));
        }

        let caption_y = ticks_y + tick_length + c.small_internal_margin;
        let block = self.text_block(caption, c.description_font, slot.width);
        let caption_height = block.height;
        out.push(DiagramNode::text(PlacedText {
            bounds: Bounds::new(slot.x, caption_y, slot.width, caption_height),
            block,
            align: TextAlign::Center,
            rotated: false,
        }));

        caption_y + caption_height - slot.y
    }

    fn text_block(&self, text: &str, font_size: f64, max_width: f64) -> TextBlock {
        layout_text(self.measure, text, font_size, max_width, self.config.line_spacing)
    }

    fn fill_for(&self, binding: Option<MetricBinding>, values: &RegionValues) -> Fill {
        let Some(binding) = binding else {
            return Fill::Solid(self.config.background);
        };
        match values.value(binding) {
            Some(t) => Fill::Solid(self.config.color_scale.color(scale_ratio(t))),
            None => {
                log::debug!("{binding} not measured; drawing placeholder");
                Fill::Neutral
            }
        }
    }
}

/// `block` centered horizontally and vertically in `bounds`
fn centered(block: TextBlock, bounds: Bounds) -> PlacedText {
    let height = block.height;
    PlacedText {
        bounds: Bounds::new(bounds.x, bounds.y + bounds.height / 2.0 - height / 2.0, bounds.width, height),
        block,
        align: TextAlign::Center,
        rotated: false,
    }
}

// =================================================================================================
// Tests
// =================================================================================================
