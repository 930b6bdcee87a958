pub mod augur;
pub mod blast;
pub mod memory;
pub mod process;
pub mod request;
pub mod traits;

pub use augur::AugurToolkit;
pub use blast::BlastToolkit;
pub use memory::MemoryToolkit;
pub use traits::{AlignmentEngine, FilterEngine, InputPreparer};
