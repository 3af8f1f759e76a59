pub mod admin_controller;
pub mod dependencies_controller;
pub mod roles_controller;
pub mod states_controller;
