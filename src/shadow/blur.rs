//! Separable blur materials and pass scheduling.

use crate::render::{BlurAxis, BlurPass, RenderTargetId};

/// Centre-out weights of the 9-tap Gaussian; taps 1..=4 are mirrored.
pub const BLUR_KERNEL: [f32; 5] = [0.1633, 0.1531, 0.122_45, 0.0918, 0.051];

/// One directional blur shader configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurMaterial {
    pub axis: BlurAxis,
    pub kernel: [f32; 5],
}

impl BlurMaterial {
    #[must_use]
    pub fn new(axis: BlurAxis) -> Self {
        Self {
            axis,
            kernel: BLUR_KERNEL,
        }
    }

    /// Unit UV direction the taps are spread along.
    #[must_use]
    pub fn direction(&self) -> [f32; 2] {
        match self.axis {
            BlurAxis::Horizontal => [1.0, 0.0],
            BlurAxis::Vertical => [0.0, 1.0],
        }
    }

    /// Same direction with a different kernel.
    #[must_use]
    pub fn with_kernel(mut self, kernel: [f32; 5]) -> Self {
        self.kernel = kernel;
        self
    }
}

/// Horizontal and vertical blur materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurMaterials {
    pub horizontal: BlurMaterial,
    pub vertical: BlurMaterial,
}

impl Default for BlurMaterials {
    fn default() -> Self {
        Self {
            horizontal: BlurMaterial::new(BlurAxis::Horizontal),
            vertical: BlurMaterial::new(BlurAxis::Vertical),
        }
    }
}

/// Both blur iterations: horizontal into `scratch`, vertical back into
/// `raw`, first at `amount` then at `amount * second_ratio`.
#[must_use]
pub fn blur_schedule(
    materials: &BlurMaterials,
    raw: RenderTargetId,
    scratch: RenderTargetId,
    amount: f32,
    second_ratio: f32,
) -> [BlurPass; 4] {
    let pair = |radius: f32| {
        [
            BlurPass {
                material: materials.horizontal,
                radius,
                source: raw,
                destination: scratch,
            },
            BlurPass {
                material: materials.vertical,
                radius,
                source: scratch,
                destination: raw,
            },
        ]
    };
    let [h1, v1] = pair(amount);
    let [h2, v2] = pair(amount * second_ratio);
    [h1, v1, h2, v2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalised() {
        let sum = BLUR_KERNEL[0] + 2.0 * BLUR_KERNEL[1..].iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-3, "kernel sums to {sum}");
    }

    #[test]
    fn kernel_falls_off_from_centre() {
        assert!(BLUR_KERNEL.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn schedule_pairs_each_pass_with_its_material() {
        let mut targets: slotmap::SlotMap<RenderTargetId, ()> = slotmap::SlotMap::with_key();
        let raw = targets.insert(());
        let scratch = targets.insert(());
        let passes = blur_schedule(&BlurMaterials::default(), raw, scratch, 5.0, 0.4);

        let axes: Vec<_> = passes.iter().map(BlurPass::axis).collect();
        assert_eq!(
            axes,
            [BlurAxis::Horizontal, BlurAxis::Vertical, BlurAxis::Horizontal, BlurAxis::Vertical]
        );
        assert!(passes.iter().all(|p| p.material.kernel == BLUR_KERNEL));
        assert_eq!(passes[1].material.direction(), [0.0, 1.0]);
    }
}
