//! Block-level layout: text blocks, images, buttons and canvases.

use crate::error::{Error, Result};
use crate::lrf::objects::{Attrs, Object, ObjectBody, ObjectKind, SubState, TextElement};
use crate::style::{ResolvedBlockStyle, ResolvedTextStyle};

use super::flow::{FlowEnv, flow_text};
use super::hyphenate::Hyphenator;
use super::line::{Line, RunContent};
use super::page::{BoxStyle, Fragment, Link, Rect};
use super::paginate::Paginator;

/// Content laid out at fixed size.
#[derive(Debug, Default)]
pub(super) struct Placed {
    pub height: i32,
    pub width: i32,
    pub fragments: Vec<Fragment>,
    pub links: Vec<Link>,
    /// Objects laid out inside this unit, such as canvas children.
    pub objects: Vec<u32>,
    /// Content was cut off; what follows starts on a new page.
    pub break_after: bool,
}

impl Placed {
    pub fn append(&mut self, other: Placed, dx: i32, dy: i32) {
        self.fragments
            .extend(other.fragments.into_iter().map(|f| f.translate(dx, dy)));
        self.links
            .extend(other.links.into_iter().map(|l| l.translate(dx, dy)));
        self.objects.extend(other.objects);
    }
}

#[derive(Debug)]
pub(super) enum BlockBody {
    /// Lines that may continue on the next page.
    Flow {
        lines: Vec<Line>,
        content_x: i32,
        top: i32,
        bottom: i32,
        width: i32,
        box_style: Option<BoxStyle>,
    },
    Atomic(Placed),
}

#[derive(Debug)]
pub(super) struct BlockLayout {
    /// Objects that start with this block.
    pub objects: Vec<u32>,
    pub body: BlockBody,
}

impl BlockLayout {
    fn atomic(objects: Vec<u32>, placed: Placed) -> Self {
        Self {
            objects,
            body: BlockBody::Atomic(placed),
        }
    }

    /// Lay everything out at once (inside canvases).
    pub fn into_placed(self, paginator: &Paginator<'_>) -> Placed {
        match self.body {
            BlockBody::Atomic(placed) => placed,
            BlockBody::Flow {
                lines,
                content_x,
                top,
                bottom,
                width,
                box_style,
            } => {
                let mut placed = Placed::default();
                let mut y = top;
                for line in &lines {
                    paginator.line_fragments(line, content_x, y, &mut placed.fragments, &mut placed.links);
                    y += line.advance();
                }
                placed.height = y + bottom;
                placed.width = width;
                if let Some(style) = box_style {
                    placed.fragments.insert(
                        0,
                        Fragment::Box {
                            rect: Rect::new(0, 0, width, placed.height),
                            style,
                        },
                    );
                }
                placed
            }
        }
    }
}

pub(super) fn box_style(style: &ResolvedBlockStyle) -> Option<BoxStyle> {
    (!style.bg_color.is_transparent() || style.frame_width > 0).then_some(BoxStyle {
        bg: style.bg_color,
        frame_width: style.frame_width,
        frame_color: style.frame_color,
        frame_mode: style.frame_mode,
    })
}

impl<'b> Paginator<'b> {
    /// Lay out any object that can appear in a page or canvas.
    pub(super) fn layout_object(
        &mut self,
        object: &Object,
        layers: &[&Attrs],
        width_limit: i32,
    ) -> Result<Option<BlockLayout>> {
        match object.kind {
            ObjectKind::Block => self.layout_block(object, layers, width_limit),
            ObjectKind::Text | ObjectKind::SimpleText => {
                let style = ResolvedBlockStyle {
                    width: width_limit,
                    ..ResolvedBlockStyle::default()
                };
                Ok(self
                    .layout_body(object, object.id, &style, layers, width_limit)?
                    .map(|body| BlockLayout { objects: vec![object.id], body }))
            }
            ObjectKind::Image | ObjectKind::Button => {
                let style = ResolvedBlockStyle::default();
                Ok(self
                    .layout_body(object, object.id, &style, layers, width_limit)?
                    .map(|body| BlockLayout { objects: vec![object.id], body }))
            }
            ObjectKind::Canvas | ObjectKind::Header | ObjectKind::Footer => {
                let mut placed = self.layout_canvas(object, layers)?;
                let mut objects = vec![object.id];
                objects.append(&mut placed.objects);
                Ok(Some(BlockLayout::atomic(objects, placed)))
            }
            other => {
                tracing::warn!(object = object.id, kind = other.name(), "object cannot be placed on a page");
                Ok(None)
            }
        }
    }

    fn layout_block(&mut self, block: &Object, layers: &[&Attrs], width_limit: i32) -> Result<Option<BlockLayout>> {
        let ObjectBody::Block { attr, child } = &block.body else {
            return Ok(None);
        };
        let attr_attrs = self.attrs_of(*attr);
        let mut block_layers: Vec<&Attrs> = attr_attrs.into_iter().collect();
        block_layers.push(&block.attrs);
        let mut style = self.styles.block_style(&block_layers);
        style.width = style.width.min(width_limit).max(0);

        let Some(child) = child.and_then(|id| self.book.object(id)) else {
            tracing::debug!(object = block.id, "block has no body");
            let placed = Placed {
                height: style.max_y().unwrap_or(0),
                width: style.width,
                ..Placed::default()
            };
            return Ok(Some(BlockLayout::atomic(vec![block.id], placed)));
        };

        let mut text_layers: Vec<&Attrs> = layers.to_vec();
        text_layers.extend(block_layers);
        let body = self.layout_body(child, block.id, &style, &text_layers, style.width)?;
        Ok(body.map(|mut body| {
            let mut objects = vec![block.id, child.id];
            if let BlockBody::Atomic(placed) = &mut body {
                objects.append(&mut placed.objects);
            }
            BlockLayout { objects, body }
        }))
    }

    /// Lay out a block's body object inside `style`.
    fn layout_body(
        &mut self,
        body: &Object,
        block_id: u32,
        style: &ResolvedBlockStyle,
        layers: &[&Attrs],
        width: i32,
    ) -> Result<Option<BlockBody>> {
        let inset = style.frame_width;
        let content_x = style.side_margin + inset;
        let top = style.top_skip + inset;
        let bottom = style.foot_skip + inset;
        let inner_width = (width - 2 * content_x).max(0);

        match &body.body {
            ObjectBody::Text { attr, elements } => {
                let text_attr = self.attrs_of(*attr);
                let mut text_layers = layers.to_vec();
                text_layers.extend(text_attr);
                text_layers.push(&body.attrs);
                let text_style = self.styles.text_style(&text_layers);
                let lines = self.flow(elements, &text_style, inner_width);

                match style.max_y() {
                    None => Ok(Some(BlockBody::Flow {
                        lines,
                        content_x,
                        top,
                        bottom,
                        width,
                        box_style: box_style(style),
                    })),
                    Some(max_y) => {
                        let (lines, break_after) = self.fit_lines(lines, top, max_y, block_id)?;
                        let mut placed = Placed {
                            height: max_y,
                            width,
                            break_after,
                            ..Placed::default()
                        };
                        if let Some(box_style) = box_style(style) {
                            placed.fragments.push(Fragment::Box {
                                rect: Rect::new(0, 0, width, max_y),
                                style: box_style,
                            });
                        }
                        let mut y = top;
                        for line in &lines {
                            self.line_fragments(line, content_x, y, &mut placed.fragments, &mut placed.links);
                            y += line.advance();
                        }
                        Ok(Some(BlockBody::Atomic(placed)))
                    }
                }
            }
            ObjectBody::Image(_) => {
                let (w, h, stream) = self.image_size(body);
                let height = style.max_y().unwrap_or(h + top + bottom);
                let mut placed = Placed {
                    height,
                    width: (w + 2 * content_x).max(if style.rule.is_horz_fixed() { width } else { 0 }),
                    ..Placed::default()
                };
                if let Some(box_style) = box_style(style) {
                    placed.fragments.push(Fragment::Box {
                        rect: Rect::new(0, 0, placed.width, height),
                        style: box_style,
                    });
                }
                placed.fragments.push(Fragment::Image {
                    rect: Rect::new(content_x, top, w, h),
                    image: body.id,
                    stream,
                });
                Ok(Some(BlockBody::Atomic(placed)))
            }
            ObjectBody::Button(button) => {
                let image = button
                    .state(SubState::Base)
                    .and_then(|s| s.image)
                    .and_then(|id| self.book.object(id));
                let (w, h, stream, image_id) = match image {
                    Some(image) => {
                        let (w, h, stream) = self.image_size(image);
                        (w, h, stream, image.id)
                    }
                    None => (0, 0, None, 0),
                };
                let mut placed = Placed {
                    height: style.max_y().unwrap_or(h + top + bottom),
                    width: w + 2 * content_x,
                    ..Placed::default()
                };
                let rect = Rect::new(content_x, top, w, h);
                if image_id != 0 {
                    placed.fragments.push(Fragment::Image {
                        rect,
                        image: image_id,
                        stream,
                    });
                }
                if let Some((page, object)) = button.jump_target() {
                    let target = if object != 0 { object } else { page };
                    placed.links.push(Link { rect, target });
                }
                Ok(Some(BlockBody::Atomic(placed)))
            }
            ObjectBody::Canvas { .. } => {
                let canvas = self.layout_canvas(body, layers)?;
                Ok(Some(BlockBody::Atomic(canvas)))
            }
            _ => {
                tracing::warn!(object = body.id, kind = body.kind.name(), "unsupported block body skipped");
                Ok(None)
            }
        }
    }

    fn flow(&mut self, elements: &[TextElement], style: &ResolvedTextStyle, width: i32) -> Vec<Line> {
        let mut env = FlowEnv {
            measurer: self.measurer,
            hyphenator: Hyphenator::new(self.config.syllabify.as_ref(), self.config.force_break_chars),
            pool: &mut self.pool,
            scale: self.styles.scale(),
        };
        flow_text(elements, style, width, &mut env)
    }

    /// Keep the lines that end within `max_y`; the flag is set when some
    /// were dropped.
    fn fit_lines(&self, lines: Vec<Line>, top: i32, max_y: i32, block: u32) -> Result<(Vec<Line>, bool)> {
        if max_y == 0 {
            return Ok((Vec::new(), false));
        }
        let total = lines.len();
        let mut y = top;
        let kept: Vec<Line> = lines
            .into_iter()
            .take_while(|line| {
                let fits = y + line.height <= max_y;
                y += line.advance();
                fits
            })
            .collect();
        let exceeded = kept.len() < total;
        if exceeded {
            self.recover(block, Error::HeightExceeded { block, max_y })?;
        }
        Ok((kept, exceeded))
    }

    /// Emit the fragments and links of one line whose top is at `y`.
    pub(super) fn line_fragments(
        &self,
        line: &Line,
        origin_x: i32,
        y: i32,
        fragments: &mut Vec<Fragment>,
        links: &mut Vec<Link>,
    ) {
        let x0 = origin_x + line.offset;
        let baseline = y + line.ascent;
        for run in &line.runs {
            match &run.content {
                RunContent::Text(text) => fragments.push(Fragment::Text {
                    x: x0 + run.x,
                    baseline,
                    width: run.width,
                    height: line.ascent,
                    text: text.clone(),
                    style: run.style,
                }),
                RunContent::Plot(plot) => {
                    let stream = self.book.object(plot.image).and_then(|image| match &image.body {
                        ObjectBody::Image(r) => r.stream,
                        _ => None,
                    });
                    let h = plot.height as i32;
                    fragments.push(Fragment::Image {
                        rect: Rect::new(x0 + run.x, baseline - h, run.width, h),
                        image: plot.image,
                        stream,
                    });
                }
            }
        }
        links.extend(line.links.iter().map(|region| Link {
            rect: Rect::new(x0 + region.x0, y, region.x1 - region.x0, line.height),
            target: region.target,
        }));
    }

    /// Display size and stream of an Image object.
    pub(super) fn image_size(&self, image: &Object) -> (i32, i32, Option<u32>) {
        let ObjectBody::Image(r) = &image.body else {
            return (0, 0, None);
        };
        if r.size != (0, 0) {
            return (r.size.0 as i32, r.size.1 as i32, r.stream);
        }
        let decoded = r
            .stream
            .and_then(|id| self.book.object(id))
            .and_then(|stream| match &stream.body {
                ObjectBody::ImageStream(encoding) => self.images.decode(stream.stream_bytes(), *encoding),
                _ => None,
            });
        match decoded {
            Some(raster) => (raster.width as i32, raster.height as i32, r.stream),
            None => {
                tracing::warn!(object = image.id, "image has no size and its stream could not be probed");
                (0, 0, r.stream)
            }
        }
    }

    /// Attributes of a referenced style object.
    pub(super) fn attrs_of(&self, id: Option<u32>) -> Option<&'b Attrs> {
        id.and_then(|id| self.book.object(id)).map(|o| &o.attrs)
    }
}
