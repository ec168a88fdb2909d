use glam::{Affine3A, Mat4, Vec3};

/// Projection of a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    /// Right-handed projection with a `[0, 1]` depth range.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }
}

/// A camera placed by a world matrix; looks down its local -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    world: Affine3A,
}

impl Camera {
    /// Perspective camera; `fov_degrees` is the vertical field of view.
    #[must_use]
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: fov_degrees.to_radians(),
                aspect,
                near,
                far,
            },
            world: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                left: -half_width,
                right: half_width,
                bottom: -half_height,
                top: half_height,
                near,
                far,
            },
            world: Affine3A::IDENTITY,
        }
    }

    /// Updates the aspect ratio; orthographic cameras are unaffected.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = new_aspect;
        }
    }

    #[must_use]
    pub fn aspect(&self) -> Option<f32> {
        match self.projection {
            Projection::Perspective { aspect, .. } => Some(aspect),
            Projection::Orthographic { .. } => None,
        }
    }

    #[inline]
    pub fn set_world(&mut self, world: Affine3A) {
        self.world = world;
    }

    #[inline]
    #[must_use]
    pub fn world(&self) -> Affine3A {
        self.world
    }

    /// Moves the camera keeping its orientation.
    pub fn set_position(&mut self, position: Vec3) {
        self.world.translation = position.into();
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world.translation.into()
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from(self.world.inverse())
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }
}
