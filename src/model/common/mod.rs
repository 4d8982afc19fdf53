//! Types shared between the API and database representations.

mod registration_number;

pub use registration_number::{
    RawRegistrationNumber, RegistrationNumber, REGISTRATION_NUMBER_LENGTH,
};
