pub mod prepare_env;
pub mod scripted_transport;
pub mod seed;
