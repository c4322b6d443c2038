pub mod counter;
pub mod donation;
pub mod engagement;
pub mod interaction;
pub mod page;
pub mod pet;
pub mod post;
pub mod user;
pub mod vet_help;
