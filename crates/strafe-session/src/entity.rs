//! Entity directory seam and the capabilities the router queries.

use glam::Vec3;
use strafe_net::{EntityId, ParticipantId, UserCmd};

/// Authoritative movement state of a controlled entity after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Motion {
    /// World-space origin.
    pub origin: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Velocity inherited from the ground entity.
    pub base_velocity: Vec3,
}

/// Reacts to a participant's crosshair entering or leaving it.
pub trait Interactable {
    /// `participant` started hovering this entity.
    fn mouse_enter(&mut self, participant: ParticipantId);

    /// `participant` stopped hovering this entity.
    fn mouse_exit(&mut self, participant: ParticipantId);
}

/// A simulation entity. Capabilities are queried explicitly.
pub trait Entity {
    /// The [`Interactable`] capability, if this entity has it.
    fn as_interactable(&mut self) -> Option<&mut dyn Interactable> {
        None
    }
}

/// An entity driven by player commands. Movement integration lives behind it.
pub trait Controllable {
    /// Apply one command. `is_prediction` marks client-side speculation.
    fn run_command(&mut self, cmd: &UserCmd, is_prediction: bool);

    /// Movement state after the last command.
    fn motion(&self) -> Motion;
}

/// Lookup of simulation entities.
pub trait EntityDirectory {
    /// Find a live entity.
    fn find(&mut self, id: EntityId) -> Option<&mut dyn Entity>;

    /// The entity `participant` currently controls, if any.
    fn controlled_by(&mut self, participant: ParticipantId) -> Option<&mut dyn Controllable>;
}
