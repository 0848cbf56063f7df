//! Viewer camera and projection.
//!
//! The renderers only consume two things from the camera: the combined
//! model-view-projection matrix and the direction the camera looks in.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4, perspective};

/// Maps OpenGL clip space depth (-1..1) onto wgpu's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.001;

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    pub projection: Projection,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
        projection: Projection,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: Rad(0.0),
            projection,
        };
        camera.set_pitch(pitch);
        camera
    }

    pub fn yaw(&self) -> Rad<f32> {
        self.yaw
    }

    pub fn pitch(&self) -> Rad<f32> {
        self.pitch
    }

    pub fn set_yaw<Y: Into<Rad<f32>>>(&mut self, yaw: Y) {
        self.yaw = yaw.into();
    }

    /// Pitch is kept just short of straight up/down so the view basis never degenerates.
    pub fn set_pitch<P: Into<Rad<f32>>>(&mut self, pitch: P) {
        let Rad(pitch) = pitch.into();
        self.pitch = Rad(pitch.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    /// Unit vector the camera is looking along.
    pub fn view_vector(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.view_vector(), Vector3::unit_y())
    }

    pub fn mvp_matrix(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.view_matrix()
    }

    /// Moves the camera back along its view vector until the whole sphere
    /// (`xyz` centre, `w` radius) fits in the vertical field of view.
    pub fn frame_bounding_sphere(&mut self, sphere: Vector4<f32>) {
        let center = Point3::new(sphere.x, sphere.y, sphere.z);
        let radius = sphere.w.max(f32::EPSILON);
        let half_fov = self.projection.fovy.0 * 0.5;
        let distance = radius / half_fov.sin();
        self.position = center - self.view_vector() * distance;
        self.projection.znear = (distance - radius).max(0.01);
        self.projection.zfar = distance + radius * 2.0;
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
