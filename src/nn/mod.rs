mod activation;
mod init;
mod linear;
mod module;
mod network;
mod output;
mod storage;
mod variable;

pub use activation::{Activation, ActivationFunction};
pub use init::Initialization;
pub use linear::Linear;
pub use module::{Layer, Ports};
pub use network::Network;
pub use output::{SoftmaxOutput, SquaredErrorOutput};
pub use storage::{Parameter, Storage};
pub use variable::{Variable, VariableId};
