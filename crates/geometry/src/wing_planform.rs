//! Trapezoidal wing planform relations.
//!
//! Each relation returns its value together with exact analytic partial
//! derivatives, the same value/derivative contract the propulsion surrogates
//! expose, so these feed the same gradient-based solver without finite
//! differencing.

/// Mean aerodynamic chord of a trapezoidal planform (m), from planform area
/// `s_ref` (m^2), aspect ratio `ar` and taper ratio `taper`.
pub fn mac_trapezoidal(s_ref: f64, ar: f64, taper: f64) -> f64 {
    let c_root = (s_ref / ar).sqrt() * 2. / (1. + taper);
    let c_tip = taper * c_root;
    2. / 3. * (c_root + c_tip - c_root * c_tip / (c_root + c_tip))
}

/// Partial derivatives of [`mac_trapezoidal`] with respect to
/// (`s_ref`, `ar`, `taper`).
pub fn mac_trapezoidal_partials(s_ref: f64, ar: f64, taper: f64) -> [f64; 3] {
    let c_root = (s_ref / ar).sqrt() * 2. / (1. + taper);
    let dcr_ds = 0.5 / (s_ref * ar).sqrt() * 2. / (1. + taper);
    let dcr_dar = -0.5 * s_ref.sqrt() / ar.powf(1.5) * 2. / (1. + taper);
    let dcr_dtaper = -(s_ref / ar).sqrt() * 2. / (1. + taper).powi(2);

    let c_tip = taper * c_root;

    let dmac_dcr = 2. / 3. * (1. - c_tip.powi(2) / (c_root + c_tip).powi(2));
    let dmac_dct = 2. / 3. * (1. - c_root.powi(2) / (c_root + c_tip).powi(2));

    [
        (dmac_dcr + dmac_dct * taper) * dcr_ds,
        (dmac_dcr + dmac_dct * taper) * dcr_dar,
        (dmac_dcr + dmac_dct * taper) * dcr_dtaper + dmac_dct * c_root,
    ]
}

/// Wing span (m) from planform area `s_ref` (m^2) and aspect ratio `ar`.
pub fn span(s_ref: f64, ar: f64) -> f64 {
    s_ref.sqrt() * ar.sqrt()
}

/// Partial derivatives of [`span`] with respect to (`s_ref`, `ar`).
pub fn span_partials(s_ref: f64, ar: f64) -> [f64; 2] {
    [
        0.5 / s_ref.sqrt() * ar.sqrt(),
        s_ref.sqrt() * 0.5 / ar.sqrt(),
    ]
}

/// Aspect ratio from wing span `span` (m) and planform area `s_ref` (m^2).
pub fn aspect_ratio(span: f64, s_ref: f64) -> f64 {
    span.powi(2) / s_ref
}

/// Partial derivatives of [`aspect_ratio`] with respect to (`span`, `s_ref`).
pub fn aspect_ratio_partials(span: f64, s_ref: f64) -> [f64; 2] {
    [2. * span / s_ref, -span.powi(2) / s_ref.powi(2)]
}
