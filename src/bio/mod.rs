pub mod fasta;
pub mod hits;
pub mod metadata;
pub mod sequence;
pub mod strains;

pub use hits::AlignmentHit;
pub use sequence::Sequence;
pub use strains::StrainSet;
