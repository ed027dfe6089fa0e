//! FilterBank: the closed set of per-frame pixel transforms.
//!
//! Every filter takes an RGB frame and returns a new RGB frame of the same
//! size. Filters whose natural output is a single channel (gray, edges,
//! threshold, sobel) are expanded back to three equal channels so the
//! compositor and the window never see anything but RGB.
//!
//! All arithmetic is integer or fixed-point; results saturate to 0..=255 and
//! are bit-identical whether rows run serially or on the rayon pool.
//! Neighbourhood filters read past the edge with reflect-101 indexing
//! (`dcb|abcd|cba` → `cb|abcd|cb`).

use rayon::prelude::*;
use tracing::{trace, warn};

use crate::types::Frame;

/// Selectable filters, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    #[default]
    Identity,
    Gray,
    Blur,
    Canny,
    Invert,
    Sepia,
    Emboss,
    Sharpen,
    Threshold,
    SobelX,
    Edges,
}

impl Filter {
    pub const ALL: [Filter; 11] = [
        Filter::Identity,
        Filter::Gray,
        Filter::Blur,
        Filter::Canny,
        Filter::Invert,
        Filter::Sepia,
        Filter::Emboss,
        Filter::Sharpen,
        Filter::Threshold,
        Filter::SobelX,
        Filter::Edges,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Filter::Identity => "identity",
            Filter::Gray => "gray",
            Filter::Blur => "blur",
            Filter::Canny => "canny",
            Filter::Invert => "invert",
            Filter::Sepia => "sepia",
            Filter::Emboss => "emboss",
            Filter::Sharpen => "sharpen",
            Filter::Threshold => "threshold",
            Filter::SobelX => "sobel_x",
            Filter::Edges => "edges",
        }
    }

    pub fn from_name(name: &str) -> Option<Filter> {
        Filter::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Like [`Filter::from_name`], but a stale or unknown id falls back to identity.
    pub fn resolve(name: &str) -> Filter {
        Filter::from_name(name).unwrap_or_else(|| {
            warn!(filter = name, "unknown filter, using identity");
            Filter::Identity
        })
    }

    fn index(self) -> usize {
        Filter::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Filter {
        Filter::ALL[(self.index() + 1) % Filter::ALL.len()]
    }

    pub fn previous(self) -> Filter {
        let n = Filter::ALL.len();
        Filter::ALL[(self.index() + n - 1) % n]
    }
}

/// Run `filter` over `src`. Pure: `src` is never modified.
pub fn apply(src: &Frame, filter: Filter) -> Frame {
    trace!(filter = filter.name(), w = src.width(), h = src.height(), "apply filter");
    if src.width() == 0 || src.height() == 0 {
        return src.clone();
    }
    match filter {
        Filter::Identity => src.clone(),
        Filter::Gray => expand_gray(&luma(src), src.width(), src.height()),
        Filter::Blur => gaussian_blur(src, BLUR_TAPS, BLUR_SIGMA),
        Filter::Canny => canny(src, 100, 200),
        Filter::Edges => canny(src, 50, 150),
        Filter::Invert => map_channels(src, |v| 255 - v),
        Filter::Sepia => sepia(src),
        Filter::Emboss => convolve3x3(src, &EMBOSS),
        Filter::Sharpen => convolve3x3(src, &SHARPEN),
        Filter::Threshold => {
            let gray: Vec<u8> = luma(src).into_iter().map(|v| if v > 127 { 255 } else { 0 }).collect();
            expand_gray(&gray, src.width(), src.height())
        }
        Filter::SobelX => sobel_x5(src),
    }
}

/// Apply by wire name; unknown names behave as identity.
pub fn apply_named(src: &Frame, name: &str) -> Frame {
    apply(src, Filter::resolve(name))
}

/* ------------------------------- kernels ------------------------------- */

pub const BLUR_TAPS: usize = 15;
/// Sigma a 15-tap Gaussian gets when left automatic: 0.3 * ((15 - 1) / 2 - 1) + 0.8.
pub const BLUR_SIGMA: f32 = 2.6;

pub const EMBOSS: [[i32; 3]; 3] = [[0, -1, -1], [1, 0, -1], [1, 1, 0]];
pub const SHARPEN: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

const SOBEL5_SMOOTH: [i32; 5] = [1, 4, 6, 4, 1];
const SOBEL5_DERIV: [i32; 5] = [-1, -2, 0, 2, 1];

/* ------------------------------- helpers ------------------------------- */

/// Reflect-101 index into `0..n`.
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let mut i = i;
    // Loop handles kernels wider than the image.
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// BT.601 luma in Q14 fixed point.
fn luma(src: &Frame) -> Vec<u8> {
    src.as_raw()
        .chunks_exact(3)
        .map(|p| ((4899 * p[0] as u32 + 9617 * p[1] as u32 + 1868 * p[2] as u32 + 8192) >> 14) as u8)
        .collect()
}

/// Single channel → three equal channels.
fn expand_gray(gray: &[u8], w: u32, h: u32) -> Frame {
    let mut out = Frame::new(w, h);
    for (px, &g) in out.chunks_exact_mut(3).zip(gray) {
        px.fill(g);
    }
    out
}

fn map_channels(src: &Frame, f: impl Fn(u8) -> u8 + Sync) -> Frame {
    let mut out = src.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_iter_mut().for_each(|v| *v = f(*v));
    out
}

fn sepia(src: &Frame) -> Frame {
    // Rows are R', G', B' in Q10.
    const M: [[u32; 3]; 3] = [[402, 787, 194], [357, 702, 172], [279, 547, 134]];
    let mut out = src.clone();
    out.par_chunks_exact_mut(3).for_each(|px| {
        let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
        for (c, row) in M.iter().enumerate() {
            px[c] = ((row[0] * r + row[1] * g + row[2] * b + 512) >> 10).min(255) as u8;
        }
    });
    out
}

/// 3x3 correlation (kernel not flipped), per channel, saturating.
fn convolve3x3(src: &Frame, k: &[[i32; 3]; 3]) -> Frame {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let data = src.as_raw();
    let mut out = Frame::new(src.width(), src.height());
    out.par_chunks_mut(w * 3).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            for c in 0..3 {
                let mut acc = 0i32;
                for (ky, krow) in k.iter().enumerate() {
                    let sy = reflect(y as isize + ky as isize - 1, h);
                    for (kx, &kv) in krow.iter().enumerate() {
                        if kv == 0 {
                            continue;
                        }
                        let sx = reflect(x as isize + kx as isize - 1, w);
                        acc += kv * data[(sy * w + sx) * 3 + c] as i32;
                    }
                }
                row[x * 3 + c] = clamp_u8(acc);
            }
        }
    });
    out
}

/// Normalised Gaussian taps in Q8 (sum is exactly 256).
fn gaussian_taps_q8(taps: usize, sigma: f32) -> Vec<u32> {
    let half = (taps / 2) as i32;
    let s2 = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (-half..=half).map(|i| (-((i * i) as f32) / s2).exp()).collect();
    let sum: f32 = weights.iter().sum();
    let mut q: Vec<u32> = weights.iter().map(|w| (w / sum * 256.0).round() as u32).collect();
    // Rounding drift goes into the centre tap.
    let total: u32 = q.iter().sum();
    let centre = taps / 2;
    q[centre] = (q[centre] + 256).saturating_sub(total);
    q
}

/// Separable fixed-point Gaussian: Q8 horizontal, Q8 vertical, one rounding at the end.
fn gaussian_blur(src: &Frame, taps: usize, sigma: f32) -> Frame {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let kernel = gaussian_taps_q8(taps, sigma);
    let half = (taps / 2) as isize;
    let data = src.as_raw();

    // Pass 1: horizontal, kept at Q8 precision.
    let mut tmp = vec![0u32; w * h * 3];
    tmp.par_chunks_mut(w * 3).enumerate().for_each(|(y, row)| {
        let line = &data[y * w * 3..(y + 1) * w * 3];
        for x in 0..w {
            for c in 0..3 {
                let mut acc = 0u32;
                for (i, &kv) in kernel.iter().enumerate() {
                    let sx = reflect(x as isize + i as isize - half, w);
                    acc += kv * line[sx * 3 + c] as u32;
                }
                row[x * 3 + c] = acc;
            }
        }
    });

    // Pass 2: vertical, back to 8 bits.
    let mut out = Frame::new(src.width(), src.height());
    out.par_chunks_mut(w * 3).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            for c in 0..3 {
                let mut acc = 0u32;
                for (i, &kv) in kernel.iter().enumerate() {
                    let sy = reflect(y as isize + i as isize - half, h);
                    acc += kv * tmp[(sy * w + x) * 3 + c];
                }
                row[x * 3 + c] = ((acc + 32_768) >> 16).min(255) as u8;
            }
        }
    });
    out
}

/// |d/dx| of luma with the 5x5 Sobel kernel, saturated.
fn sobel_x5(src: &Frame) -> Frame {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let gray = luma(src);
    let mut mag = vec![0u8; w * h];
    mag.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0i32;
            for (ky, &sv) in SOBEL5_SMOOTH.iter().enumerate() {
                let sy = reflect(y as isize + ky as isize - 2, h);
                for (kx, &dv) in SOBEL5_DERIV.iter().enumerate() {
                    if dv == 0 {
                        continue;
                    }
                    let sx = reflect(x as isize + kx as isize - 2, w);
                    acc += sv * dv * gray[sy * w + sx] as i32;
                }
            }
            *out = acc.unsigned_abs().min(255) as u8;
        }
    });
    expand_gray(&mag, src.width(), src.height())
}

/* -------------------------------- canny -------------------------------- */

/// Canny edges with `low`/`high` hysteresis on L1 gradient magnitude.
/// On colour input each pixel takes the gradient of its strongest channel.
fn canny(src: &Frame, low: i32, high: i32) -> Frame {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let data = src.as_raw();

    // 1) 3x3 Sobel per channel; keep the channel with the largest |gx| + |gy|.
    let mut grads = vec![(0i32, 0i32, 0i32); w * h];
    grads.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let ym = reflect(y as isize - 1, h);
        let yp = reflect(y as isize + 1, h);
        for (x, slot) in row.iter_mut().enumerate() {
            let xm = reflect(x as isize - 1, w);
            let xp = reflect(x as isize + 1, w);
            let at = |yy: usize, xx: usize, c: usize| data[(yy * w + xx) * 3 + c] as i32;
            let mut best = (0, 0, -1);
            for c in 0..3 {
                let gx = (at(ym, xp, c) + 2 * at(y, xp, c) + at(yp, xp, c))
                    - (at(ym, xm, c) + 2 * at(y, xm, c) + at(yp, xm, c));
                let gy = (at(yp, xm, c) + 2 * at(yp, x, c) + at(yp, xp, c))
                    - (at(ym, xm, c) + 2 * at(ym, x, c) + at(ym, xp, c));
                let m = gx.abs() + gy.abs();
                if m > best.2 {
                    best = (gx, gy, m);
                }
            }
            *slot = best;
        }
    });

    let mag = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            grads[y as usize * w + x as usize].2
        }
    };

    // 2) Non-maximum suppression, quantised to 4 directions (tan 22.5° in Q15).
    const TG22: i64 = 13_573;
    let mut state = vec![0u8; w * h]; // 0 = none, 1 = weak, 2 = strong
    state.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, s) in row.iter_mut().enumerate() {
            let (gx, gy, m) = grads[y * w + x];
            if m <= low {
                continue;
            }
            let (xi, yi) = (x as isize, y as isize);
            let ax = gx.unsigned_abs() as i64;
            let ay = (gy.unsigned_abs() as i64) << 15;
            let tg22x = ax * TG22;
            let tg67x = tg22x + (ax << 16);
            let is_max = if ay < tg22x {
                m > mag(xi - 1, yi) && m >= mag(xi + 1, yi)
            } else if ay > tg67x {
                m > mag(xi, yi - 1) && m >= mag(xi, yi + 1)
            } else if (gx < 0) == (gy < 0) {
                m > mag(xi - 1, yi - 1) && m >= mag(xi + 1, yi + 1)
            } else {
                m > mag(xi + 1, yi - 1) && m >= mag(xi - 1, yi + 1)
            };
            if is_max {
                *s = if m > high { 2 } else { 1 };
            }
        }
    });

    // 3) Hysteresis: weak pixels survive only when 8-connected to a strong one.
    let mut edges = vec![0u8; w * h];
    let mut stack: Vec<usize> = (0..w * h).filter(|&i| state[i] == 2).collect();
    for &i in &stack {
        edges[i] = 255;
    }
    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if state[j] == 1 && edges[j] == 0 {
                    edges[j] = 255;
                    stack.push(j);
                }
            }
        }
    }

    expand_gray(&edges, src.width(), src.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        Frame::from_pixel(w, h, Rgb(rgb))
    }

    /// Left half black, right half white.
    fn step(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, |x, _| if x < w / 2 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) })
    }

    fn is_gray(f: &Frame) -> bool {
        f.pixels().all(|p| p[0] == p[1] && p[1] == p[2])
    }

    #[test]
    fn names_round_trip_and_unknown_is_identity() {
        for f in Filter::ALL {
            assert_eq!(Filter::from_name(f.name()), Some(f));
        }
        assert_eq!(Filter::from_name("nonexistent-id"), None);
        assert_eq!(Filter::resolve("nonexistent-id"), Filter::Identity);

        let img = Frame::from_fn(7, 5, |x, y| Rgb([x as u8 * 30, y as u8 * 40, 99]));
        assert_eq!(apply_named(&img, "nonexistent-id"), img);
    }

    #[test]
    fn next_and_previous_cycle() {
        assert_eq!(Filter::Identity.next(), Filter::Gray);
        assert_eq!(Filter::Edges.next(), Filter::Identity);
        assert_eq!(Filter::Identity.previous(), Filter::Edges);
        for f in Filter::ALL {
            assert_eq!(f.next().previous(), f);
        }
    }

    #[test]
    fn every_filter_keeps_size_and_three_channels() {
        let img = Frame::from_fn(9, 6, |x, y| Rgb([(x * 25) as u8, (y * 40) as u8, ((x + y) * 10) as u8]));
        for f in Filter::ALL {
            let out = apply(&img, f);
            assert_eq!(out.dimensions(), img.dimensions(), "{}", f.name());
            assert_eq!(out.as_raw().len(), img.as_raw().len(), "{}", f.name());
        }
    }

    #[test]
    fn tiny_and_empty_images_do_not_panic() {
        for (w, h) in [(1, 1), (1, 4), (3, 1), (0, 0), (0, 3)] {
            let img = solid(w, h, [10, 20, 30]);
            for f in Filter::ALL {
                assert_eq!(apply(&img, f).dimensions(), (w, h));
            }
        }
    }

    #[test]
    fn gray_uses_bt601_weights() {
        let out = apply(&solid(2, 2, [255, 0, 0]), Filter::Gray);
        assert!(is_gray(&out));
        assert_eq!(out.get_pixel(0, 0)[0], 76);

        let out = apply(&solid(1, 1, [255, 255, 255]), Filter::Gray);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn invert_is_an_involution() {
        let img = Frame::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 200]));
        let once = apply(&img, Filter::Invert);
        assert_eq!(once.get_pixel(0, 0).0, [255, 255, 55]);
        assert_eq!(apply(&once, Filter::Invert), img);
    }

    #[test]
    fn sepia_saturates_white() {
        let out = apply(&solid(2, 2, [255, 255, 255]), Filter::Sepia);
        assert_eq!(out.get_pixel(1, 1).0, [255, 255, 239]);
    }

    #[test]
    fn blur_and_sharpen_leave_flat_regions_alone() {
        let img = solid(20, 20, [40, 120, 220]);
        assert_eq!(apply(&img, Filter::Blur), img);
        assert_eq!(apply(&img, Filter::Sharpen), img);
    }

    #[test]
    fn blur_taps_sum_to_one() {
        let taps = gaussian_taps_q8(BLUR_TAPS, BLUR_SIGMA);
        assert_eq!(taps.len(), BLUR_TAPS);
        assert_eq!(taps.iter().sum::<u32>(), 256);
        assert_eq!(taps.first(), taps.last());
    }

    #[test]
    fn blur_softens_a_step() {
        let out = apply(&step(30, 4), Filter::Blur);
        let mid = out.get_pixel(15, 2)[0];
        assert!(mid > 0 && mid < 255, "step edge should be smoothed, got {mid}");
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(29, 0)[0], 255);
    }

    #[test]
    fn sharpen_clips_instead_of_wrapping() {
        let out = apply(&step(10, 3), Filter::Sharpen);
        // Dark side of the edge would go to -255, bright side to 510.
        assert_eq!(out.get_pixel(4, 1)[0], 0);
        assert_eq!(out.get_pixel(5, 1)[0], 255);
    }

    #[test]
    fn emboss_flat_is_zero() {
        // Kernel sums to zero, so a flat image embosses to black.
        let out = apply(&solid(5, 5, [200, 100, 50]), Filter::Emboss);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn threshold_is_binary() {
        let img = Frame::from_fn(16, 1, |x, _| Rgb([(x * 16) as u8; 3]));
        let out = apply(&img, Filter::Threshold);
        assert!(is_gray(&out));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(7, 0)[0], 0); // 112
        assert_eq!(out.get_pixel(8, 0)[0], 255); // 128
    }

    #[test]
    fn sobel_x_responds_to_vertical_edges_only() {
        let out = apply(&step(12, 8), Filter::SobelX);
        assert!(is_gray(&out));
        assert_eq!(out.get_pixel(5, 4)[0], 255);
        assert_eq!(out.get_pixel(0, 4)[0], 0);

        let horizontal = Frame::from_fn(8, 12, |_, y| if y < 6 { Rgb([0; 3]) } else { Rgb([255; 3]) });
        let out = apply(&horizontal, Filter::SobelX);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn canny_marks_a_thin_edge() {
        for f in [Filter::Canny, Filter::Edges] {
            let out = apply(&step(20, 10), f);
            assert!(is_gray(&out));
            assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
            for y in 0..10 {
                let hits: Vec<u32> = (0..20).filter(|&x| out.get_pixel(x, y)[0] == 255).collect();
                assert!(!hits.is_empty(), "{} row {y} lost its edge", f.name());
                assert!(hits.iter().all(|&x| (8..=11).contains(&x)), "{} row {y}: {hits:?}", f.name());
            }
        }
        assert!(apply(&solid(10, 10, [90, 90, 90]), Filter::Canny).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn filters_are_deterministic() {
        let img = Frame::from_fn(33, 17, |x, y| Rgb([(x * 7 + y) as u8, (y * 13) as u8, ((x ^ y) * 9) as u8]));
        for f in Filter::ALL {
            assert_eq!(apply(&img, f), apply(&img, f), "{}", f.name());
        }
    }

    #[test]
    fn reflect_101_indexing() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(6, 5), 2);
        assert_eq!(reflect(-7, 3), 1);
        assert_eq!(reflect(4, 1), 0);
    }
}
