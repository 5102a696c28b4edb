//! Canvases: children placed at absolute offsets and clipped to the canvas.

use crate::error::Result;
use crate::lrf::objects::{Attrs, Object, ObjectBody};

use super::block::Placed;
use super::page::{Link, Rect};
use super::paginate::Paginator;

impl<'b> Paginator<'b> {
    pub(super) fn layout_canvas(&mut self, canvas: &Object, layers: &[&Attrs]) -> Result<Placed> {
        let ObjectBody::Canvas {
            width,
            height,
            placements,
        } = &canvas.body
        else {
            return Ok(Placed::default());
        };
        let bounds = Rect::new(0, 0, *width, *height);
        let mut placed = Placed {
            width: *width,
            height: *height,
            ..Placed::default()
        };

        for placement in placements {
            self.check_cancelled()?;
            let Some(child) = self.book.object(placement.object) else {
                tracing::warn!(object = canvas.id, child = placement.object, "canvas child missing");
                continue;
            };
            let Some(mut layout) = self.layout_object(child, layers, (width - placement.x).max(0))? else {
                continue;
            };
            let mut objects = std::mem::take(&mut layout.objects);
            let child_placed = layout.into_placed(self);
            objects.extend(child_placed.objects);
            let mut clipped = false;
            let fragments = child_placed
                .fragments
                .into_iter()
                .map(|f| f.translate(placement.x, placement.y))
                .filter_map(|f| {
                    let before = f.bounds();
                    let kept = f.clip(&bounds);
                    if kept.as_ref().map(|k| k.bounds()) != Some(before) {
                        clipped = true;
                    }
                    kept
                })
                .collect::<Vec<_>>();
            let links = child_placed
                .links
                .into_iter()
                .filter_map(|l| {
                    let l = l.translate(placement.x, placement.y);
                    l.rect.intersect(&bounds).map(|rect| Link { rect, ..l })
                })
                .collect::<Vec<_>>();
            if clipped {
                tracing::warn!(object = canvas.id, child = child.id, "canvas child clipped");
            }
            placed.append(
                Placed {
                    fragments,
                    links,
                    objects,
                    ..Placed::default()
                },
                0,
                0,
            );
        }
        Ok(placed)
    }
}
