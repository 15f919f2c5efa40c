use super::*;

/// Interface between an [Axle] and the machine driving it through a
/// fixed-ratio transmission
pub trait AxleMotor {
    /// Torque currently developed at the motor shaft
    fn developed_torque(&self) -> si::Torque;
    /// Rotational inertia of the motor armature
    fn inertia(&self) -> si::MomentOfInertia;
    /// Pushes the shaft speed resulting from the axle's integration step
    fn set_angular_speed(&mut self, speed: si::AngularVelocity);
    /// Advances the motor by `dt` after its axle has been integrated
    fn update(&mut self, dt: si::Time) -> anyhow::Result<()>;
}
