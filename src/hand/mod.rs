pub mod fingers;
pub mod frame;
pub mod landmark;
pub mod touch;

pub use fingers::{finger_states, FingerStatus};
pub use frame::HandCoordinateFrame;
pub use landmark::{Hand, HandLandmarks, Landmark, LandmarkIndex};
pub use touch::{check_fingers_touching, JointPairValues, TouchState};
