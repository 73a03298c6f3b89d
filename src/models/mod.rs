pub mod legacy;
pub mod training;

pub use training::{
  CategoryRef, Exercise, NewTraining, Set, Training, DEFAULT_CATEGORY_ID, DEFAULT_CATEGORY_NAME,
};
