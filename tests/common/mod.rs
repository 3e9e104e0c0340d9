#![allow(dead_code)]

pub mod builders;
pub mod faulty_store;
pub mod mock_provisioner;
pub mod strategies;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use faulty_store::*;
#[allow(unused_imports)]
pub use mock_provisioner::*;
