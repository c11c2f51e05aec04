mod helpers;
mod mocks;
mod sync;
