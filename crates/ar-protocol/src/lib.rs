pub mod descriptor;
pub mod history;
pub mod intent;
pub mod output;
pub mod response;

pub use descriptor::*;
pub use history::*;
pub use intent::*;
pub use output::*;
pub use response::*;
