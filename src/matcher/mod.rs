pub(crate) mod condition;
pub(crate) mod operator;
pub(crate) mod resolver;
pub(crate) mod target;
pub(crate) mod target_event;
pub(crate) mod value;
pub(crate) mod value_operator;
