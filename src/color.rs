//! Conversions between sRGB and the perceptual working color spaces.
//!
//! Quantization runs in one of two working spaces selected by [`ColorSpace`]:
//!
//! - [CIELuv](https://en.wikipedia.org/wiki/CIELUV) with the D65 reference white.
//! - [ICtCp](https://professional.dolby.com/siteassets/pdfs/ictcp_dolbywhitepaper_v071.pdf),
//!   reached through linear Rec.2020 and the SMPTE ST 2084 transfer function. The Ct
//!   channel is halved so that color differences can be evaluated with plain Euclidean
//!   distances.
//!
//! Both directions are exact mathematical inverses of each other up to floating point
//! precision; every `Srgb<u8>` color round-trips bit-exactly through either space.

use palette::Srgb;

/// The working color space used for palette construction and pixel assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// CIELuv with the D65 reference white.
    #[default]
    CieLuv,
    /// ICtCp with a halved Ct channel.
    ICtCp,
}

// Reference white for the D65 illuminant.
const RW: [f64; 3] = [0.95047, 1.0, 1.08883];

const K_E: f64 = 216.0 / 24389.0;
const K_K: f64 = 24389.0 / 27.0;
const K_KE: f64 = 8.0;

// SMPTE ST 2084 constants.
const PQ_LP: f64 = 10000.0;
const PQ_M1: f64 = 0.1593017578125;
const PQ_M2: f64 = 78.84375;
const PQ_C1: f64 = 0.8359375;
const PQ_C2: f64 = 18.8515625;
const PQ_C3: f64 = 18.6875;

/// Decodes a gamma encoded sRGB component, i.e. evaluates the sRGB transfer function.
#[inline]
fn gamma_decode(component: f64) -> f64 {
    let result = if component <= 0.04045 {
        component / 12.92
    } else {
        ((component + 0.055) / 1.055).powf(2.4)
    };
    result.clamp(0.0, 1.0)
}

/// Gamma-encodes a linear sRGB component, i.e. evaluates the sRGB inverse transfer function.
#[inline]
fn gamma_encode(component: f64) -> f64 {
    let result = if component <= 0.0031308 {
        component * 12.92
    } else {
        1.055 * component.powf(1.0 / 2.4) - 0.055
    };
    result.clamp(0.0, 1.0)
}

#[inline]
fn srgb_to_xyz([r, g, b]: [f64; 3]) -> [f64; 3] {
    let r = gamma_decode(r);
    let g = gamma_decode(g);
    let b = gamma_decode(b);

    [
        r * 0.4124564 + g * 0.3575761 + b * 0.1804375,
        r * 0.2126729 + g * 0.7151522 + b * 0.0721750,
        r * 0.0193339 + g * 0.1191920 + b * 0.9503041,
    ]
}

#[inline]
fn xyz_to_srgb([x, y, z]: [f64; 3]) -> [f64; 3] {
    let r = x * 3.2404542 - y * 1.5371385 - z * 0.4985314;
    let g = -x * 0.9692660 + y * 1.8760108 + z * 0.0415560;
    let b = x * 0.0556434 - y * 0.2040259 + z * 1.0572252;
    [gamma_encode(r), gamma_encode(g), gamma_encode(b)]
}

fn xyz_to_cieluv([x, y, z]: [f64; 3]) -> [f64; 3] {
    let [rwx, rwy, rwz] = RW;

    let den = x + 15.0 * y + 3.0 * z;
    let up = if den > 0.0 { (4.0 * x) / den } else { 0.0 };
    let vp = if den > 0.0 { (9.0 * y) / den } else { 0.0 };

    let rw_den = rwx + 15.0 * rwy + 3.0 * rwz;
    let urp = (4.0 * rwx) / rw_den;
    let vrp = (9.0 * rwy) / rw_den;

    let yr = y / rwy;

    let l = if yr > K_E {
        116.0 * yr.powf(1.0 / 3.0) - 16.0
    } else {
        K_K * yr
    };

    [l, 13.0 * l * (up - urp), 13.0 * l * (vp - vrp)]
}

fn cieluv_to_xyz([l, u, v]: [f64; 3]) -> [f64; 3] {
    let [rwx, rwy, rwz] = RW;

    let y = if l > K_KE {
        ((l + 16.0) / 116.0).powi(3)
    } else {
        l / K_K
    };

    let rw_den = rwx + 15.0 * rwy + 3.0 * rwz;
    let u0 = (4.0 * rwx) / rw_den;
    let v0 = (9.0 * rwy) / rw_den;

    let a_den = u + 13.0 * l * u0;
    let a = if a_den == 0.0 {
        0.0
    } else {
        (((52.0 * l) / a_den) - 1.0) / 3.0
    };

    let b = -5.0 * y;
    let c = -1.0 / 3.0;

    let d_den = v + 13.0 * l * v0;
    let d = if d_den == 0.0 {
        0.0
    } else {
        y * (((39.0 * l) / d_den) - 5.0)
    };

    let x_den = a - c;
    let x = if x_den == 0.0 { 0.0 } else { (d - b) / x_den };

    [x, y, x * a + b]
}

#[inline]
fn xyz_to_rec2020([x, y, z]: [f64; 3]) -> [f64; 3] {
    [
        x * 1.71666343 + y * -0.35567332 + z * -0.25336809,
        x * -0.66667384 + y * 1.61645574 + z * 0.0157683,
        x * 0.01764248 + y * -0.04277698 + z * 0.94224328,
    ]
}

#[inline]
fn rec2020_to_xyz([r, g, b]: [f64; 3]) -> [f64; 3] {
    [
        r * 0.63695351 + g * 0.14461919 + b * 0.16885585,
        r * 0.26269834 + g * 0.67800877 + b * 0.0592929,
        g * 0.02807314 + b * 1.06082723,
    ]
}

/// The SMPTE ST 2084 electro-optical transfer function.
#[inline]
fn pq_eotf(component: f64) -> f64 {
    let v_p = component.powf(1.0 / PQ_M2);
    let n = (v_p - PQ_C1).max(0.0);
    PQ_LP * (n / (PQ_C2 - PQ_C3 * v_p)).powf(1.0 / PQ_M1)
}

/// The inverse of the SMPTE ST 2084 electro-optical transfer function.
#[inline]
fn pq_eotf_inverse(component: f64) -> f64 {
    let y = (component / PQ_LP).powf(PQ_M1);
    ((PQ_C1 + PQ_C2 * y) / (1.0 + PQ_C3 * y)).powf(PQ_M2)
}

/// Converts linear Rec.2020 to ICtCp with a halved Ct channel.
fn rec2020_to_ictcp([r, g, b]: [f64; 3]) -> [f64; 3] {
    let l = (r * 1688.0 + g * 2146.0 + b * 262.0) / 4096.0;
    let m = (r * 683.0 + g * 2951.0 + b * 462.0) / 4096.0;
    let s = (r * 99.0 + g * 309.0 + b * 3688.0) / 4096.0;

    let l = pq_eotf_inverse(l);
    let m = pq_eotf_inverse(m);
    let s = pq_eotf_inverse(s);

    let i = l * 0.5 + m * 0.5;
    let ct = (l * 6610.0 - m * 13613.0 + s * 7003.0) / 4096.0;
    let cp = (l * 17933.0 - m * 17390.0 - s * 543.0) / 4096.0;

    [i, ct * 0.5, cp]
}

/// Converts ICtCp with a halved Ct channel back to linear Rec.2020.
fn ictcp_to_rec2020([i, ct, cp]: [f64; 3]) -> [f64; 3] {
    let ct = ct * 2.0;

    let l = i + 0.00860904 * ct + 0.11102963 * cp;
    let m = i - 0.00860904 * ct - 0.11102963 * cp;
    let s = i + 0.56003134 * ct - 0.32062717 * cp;

    let l = pq_eotf(l);
    let m = pq_eotf(m);
    let s = pq_eotf(s);

    [
        l * 3.43660669 - m * 2.50645212 + s * 0.06984542,
        -l * 0.79132956 + m * 1.98360045 - s * 0.1922709,
        -l * 0.0259499 - m * 0.09891371 + s * 1.12486361,
    ]
}

impl ColorSpace {
    /// Convert a single sRGB color with channels in `[0, 1]` to the working space.
    #[must_use]
    pub fn to_working(self, rgb: [f64; 3]) -> [f64; 3] {
        match self {
            Self::CieLuv => xyz_to_cieluv(srgb_to_xyz(rgb)),
            Self::ICtCp => rec2020_to_ictcp(xyz_to_rec2020(srgb_to_xyz(rgb))),
        }
    }

    /// Convert a single working space color back to sRGB with channels in `[0, 1]`.
    ///
    /// Colors outside the sRGB gamut are clamped to be inside.
    #[must_use]
    pub fn to_srgb(self, color: [f64; 3]) -> [f64; 3] {
        match self {
            Self::CieLuv => xyz_to_srgb(cieluv_to_xyz(color)),
            Self::ICtCp => xyz_to_srgb(rec2020_to_xyz(ictcp_to_rec2020(color))),
        }
    }
}

/// Convert a slice of [`Srgb<f64>`] colors to working space colors.
#[must_use]
pub fn srgb_to_working(space: ColorSpace, input: &[Srgb<f64>]) -> Vec<[f64; 3]> {
    input
        .iter()
        .map(|&srgb| space.to_working(palette::cast::into_array(srgb)))
        .collect()
}

/// Convert a slice of working space colors to [`Srgb<f64>`] colors.
///
/// Colors outside the sRGB gamut are clamped to be inside.
#[must_use]
pub fn working_to_srgb(space: ColorSpace, input: &[[f64; 3]]) -> Vec<Srgb<f64>> {
    input
        .iter()
        .map(|&color| palette::cast::from_array(space.to_srgb(color)))
        .collect()
}

#[cfg(feature = "threads")]
mod parallel {
    use super::ColorSpace;
    use palette::Srgb;
    use rayon::prelude::*;

    /// Convert a slice of [`Srgb<f64>`] colors to working space colors in parallel.
    #[must_use]
    pub fn srgb_to_working_par(space: ColorSpace, input: &[Srgb<f64>]) -> Vec<[f64; 3]> {
        input
            .par_iter()
            .map(|&srgb| space.to_working(palette::cast::into_array(srgb)))
            .collect()
    }

    /// Convert a slice of working space colors to [`Srgb<f64>`] colors in parallel.
    ///
    /// Colors outside the sRGB gamut are clamped to be inside.
    #[must_use]
    pub fn working_to_srgb_par(space: ColorSpace, input: &[[f64; 3]]) -> Vec<Srgb<f64>> {
        input
            .par_iter()
            .map(|&color| palette::cast::from_array(space.to_srgb(color)))
            .collect()
    }
}

#[cfg(feature = "threads")]
pub use parallel::*;
