//! Pure color-space math consumed by node bodies.
//!
//! Functions here never touch graph state; they map numeric vectors (plus
//! optional color-space metadata such as an illuminant) to numeric vectors.
//! The GLSL skeleton in the transpiler declares the same conversions for the
//! GPU path.

/// Reference white point for CIE L*a*b* conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Illuminant {
    D65,
    D50,
}

impl Illuminant {
    /// XYZ coordinates of the white point.
    /// https://en.wikipedia.org/wiki/Standard_illuminant#White_points_of_standard_illuminants
    pub fn white_point(self) -> [f32; 3] {
        match self {
            Illuminant::D65 => [0.950_47, 1.0, 1.088_83],
            Illuminant::D50 => [0.964_22, 1.0, 0.825_21],
        }
    }
}

pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// https://en.wikipedia.org/wiki/SRGB
pub fn linear_to_srgb_channel(x: f32) -> f32 {
    if x <= 0.003_130_8 {
        12.92 * x
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

pub fn srgb_to_linear_channel(x: f32) -> f32 {
    if x <= 0.040_45 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

pub fn srgb_to_linear([r, g, b]: [f32; 3]) -> [f32; 3] {
    [
        srgb_to_linear_channel(r),
        srgb_to_linear_channel(g),
        srgb_to_linear_channel(b),
    ]
}

pub fn linear_to_srgb([r, g, b]: [f32; 3]) -> [f32; 3] {
    [
        linear_to_srgb_channel(r),
        linear_to_srgb_channel(g),
        linear_to_srgb_channel(b),
    ]
}

/// https://en.wikipedia.org/wiki/SRGB#From_CIE_XYZ_to_sRGB
pub fn xyz_to_linear_srgb([x, y, z]: [f32; 3]) -> [f32; 3] {
    let r = 3.2406 * x + -1.5372 * y + -0.4986 * z;
    let g = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let b = 0.0557 * x + -0.2040 * y + 1.0570 * z;
    [r, g, b]
}

fn lab_finv(t: f32) -> f32 {
    let epsilon = 216.0 / 24_389.0; // (6/29)^3
    let kappa = 24_389.0 / 27.0; // (29/3)^3
    let t3 = t * t * t;
    if t3 > epsilon {
        t3
    } else {
        (116.0 * t - 16.0) / kappa
    }
}

/// CIE L*a*b* -> XYZ for the given white point.
/// https://en.wikipedia.org/wiki/CIELAB_color_space
pub fn lab_to_xyz([l, a, b]: [f32; 3], illuminant: Illuminant) -> [f32; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let [xn, yn, zn] = illuminant.white_point();
    [lab_finv(fx) * xn, lab_finv(fy) * yn, lab_finv(fz) * zn]
}

/// HSL -> gamma sRGB. Hue wraps; saturation and lightness clamp.
/// https://en.wikipedia.org/wiki/HSL_and_HSV#HSL_to_RGB
pub fn hsl_to_rgb([h, s, l]: [f32; 3]) -> [f32; 3] {
    let h = h - h.floor();
    let s = clamp01(s);
    let l = clamp01(l);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h * 6.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let rgb = if hp < 1.0 {
        [c, x, 0.0]
    } else if hp < 2.0 {
        [x, c, 0.0]
    } else if hp < 3.0 {
        [0.0, c, x]
    } else if hp < 4.0 {
        [0.0, x, c]
    } else if hp < 5.0 {
        [x, 0.0, c]
    } else {
        [c, 0.0, x]
    };

    let m = l - 0.5 * c;
    [rgb[0] + m, rgb[1] + m, rgb[2] + m]
}
