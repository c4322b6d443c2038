pub mod authz;
pub mod comments;
pub mod counters;
pub mod donations;
pub mod error;
pub mod feed;
pub mod identity;
pub mod ledger;
pub mod media;
pub mod payments;
pub mod pets;
pub mod posts;
pub mod social;
pub mod users;
pub mod vet_help;
