pub mod audit;
pub mod catalog;
pub mod customer;
pub mod exchange;
pub mod part;
pub mod person;
pub mod purchase;
pub mod sale;
pub mod user;
