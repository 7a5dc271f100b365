// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nearest-neighbour textured copies on RGBA8 buffers.
//!
//! Every target pixel whose center falls inside the transformed destination
//! rectangle (and inside the clip) is mapped back through the inverse copy
//! transform to a source texel, modulated and blended source-over.

use parallax_core::backend::CopyParams;
use parallax_core::geometry::{Rect, Size, mul_u8};

/// A borrowed RGBA8 image.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Image<'a> {
    pub(crate) size: Size,
    pub(crate) pixels: &'a [u8],
}

impl Image<'_> {
    fn texel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.size.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.size.height)?;
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4)?.try_into().ok()
    }
}

/// Copies `src` onto `dst` (of size `dst_size`) as described by `params`.
pub(crate) fn copy(
    dst: &mut [u8],
    dst_size: Size,
    clip: Option<Rect>,
    src: Image<'_>,
    params: &CopyParams,
) {
    if params.dst.is_empty() || params.src.is_empty() || params.alpha == 0 {
        return;
    }
    let mut area = Rect::from_size(dst_size);
    if let Some(clip) = clip {
        let Some(clipped) = area.intersect(clip) else {
            return;
        };
        area = clipped;
    }
    let Some(area) = area.intersect(pixel_bounds(params.bounds())) else {
        return;
    };

    let inverse = params.transform().inverse();
    let scale_x = f64::from(params.src.width) / f64::from(params.dst.width);
    let scale_y = f64::from(params.src.height) / f64::from(params.dst.height);
    let (dst_w, dst_h) = (f64::from(params.dst.width), f64::from(params.dst.height));

    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            let center = kurbo::Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let local = inverse * center;
            if local.x < 0.0 || local.y < 0.0 || local.x >= dst_w || local.y >= dst_h {
                continue;
            }
            let sx = params.src.x + floor_i32(local.x * scale_x);
            let sy = params.src.y + floor_i32(local.y * scale_y);
            let Some(texel) = src.texel(sx, sy) else {
                continue;
            };
            let color = [
                mul_u8(texel[0], params.color.red),
                mul_u8(texel[1], params.color.green),
                mul_u8(texel[2], params.color.blue),
                mul_u8(texel[3], params.alpha),
            ];
            // `area` lies inside the target, so both coordinates are in range.
            let i = (y as usize * dst_size.width as usize + x as usize) * 4;
            blend(&mut dst[i..i + 4], color);
        }
    }
}

/// Source-over blend of straight-alpha `src` onto `dst`.
pub(crate) fn blend(dst: &mut [u8], src: [u8; 4]) {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    let da = u32::from(dst[3]) * (255 - sa) / 255;
    let out_a = sa + da;
    for c in 0..3 {
        let v = (u32::from(src[c]) * sa + u32::from(dst[c]) * da + out_a / 2) / out_a;
        dst[c] = to_u8(v);
    }
    dst[3] = to_u8(out_a);
}

/// Integer pixel rectangle covering a floating-point one.
fn pixel_bounds(r: kurbo::Rect) -> Rect {
    let x0 = floor_i32(r.x0);
    let y0 = floor_i32(r.y0);
    Rect::new(
        x0,
        y0,
        floor_i32(r.x1.ceil()) - x0,
        floor_i32(r.y1.ceil()) - y0,
    )
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "saturating float-to-int conversion of on-canvas coordinates"
)]
fn floor_i32(v: f64) -> i32 {
    v.floor() as i32
}

fn to_u8(v: u32) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}
