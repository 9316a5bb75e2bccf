//! SPH smoothing kernels for the PBF solver.
//!
//! The coefficients are the classic 3D Müller normalisations. The 2D solver
//! keeps them; rest density and relaxation are tuned against these values.

use glam::Vec2;
use std::f32::consts::PI;

use crate::params::SimParams;

/// Kernel functions with coefficients precomputed for one smoothing radius.
#[derive(Clone, Copy, Debug)]
pub struct Kernels {
    h: f32,
    h2: f32,
    poly6_coeff: f32,
    spiky_grad_coeff: f32,
    tensile_k: f32,
    tensile_exponent: i32,
    /// poly6 at the tensile reference distance Δq.
    w_dq: f32,
}

impl Kernels {
    pub fn new(h: f32, tensile_k: f32, tensile_dq_ratio: f32, tensile_exponent: i32) -> Self {
        let h2 = h * h;
        let h6 = h2 * h2 * h2;
        let h9 = h6 * h2 * h;
        let mut kernels = Self {
            h,
            h2,
            poly6_coeff: 315.0 / (64.0 * PI * h9),
            spiky_grad_coeff: -45.0 / (PI * h6),
            tensile_k,
            tensile_exponent,
            w_dq: 0.0,
        };
        let dq = tensile_dq_ratio * h;
        kernels.w_dq = kernels.poly6(dq * dq);
        kernels
    }

    pub fn from_params(params: &SimParams) -> Self {
        Self::new(
            params.smoothing_radius(),
            params.tensile_k,
            params.tensile_dq_ratio,
            params.tensile_exponent,
        )
    }

    #[inline]
    pub fn h(&self) -> f32 {
        self.h
    }

    #[inline]
    pub fn h2(&self) -> f32 {
        self.h2
    }

    /// Poly6 density kernel, taking the squared distance.
    #[inline]
    pub fn poly6(&self, r2: f32) -> f32 {
        if r2 >= self.h2 {
            return 0.0;
        }
        let a = self.h2 - r2;
        self.poly6_coeff * a * a * a
    }

    /// Spiky kernel gradient with respect to `r = p_i - p_j`.
    ///
    /// Zero outside the support and at zero separation.
    #[inline]
    pub fn spiky_gradient(&self, r: Vec2) -> Vec2 {
        let len = r.length();
        if len <= 0.0 || len >= self.h {
            return Vec2::ZERO;
        }
        let a = self.h - len;
        r * (self.spiky_grad_coeff * a * a / len)
    }

    /// Tensile instability term `-k (W(r) / W(Δq))^n`.
    #[inline]
    pub fn tensile_correction(&self, r2: f32) -> f32 {
        if self.w_dq <= 0.0 {
            return 0.0;
        }
        -self.tensile_k * (self.poly6(r2) / self.w_dq).powi(self.tensile_exponent)
    }
}
