pub mod charge;
pub mod coord;
pub mod domain;
pub mod gate;
pub mod layout;
