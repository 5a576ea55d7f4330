pub mod population;
pub mod rng;

pub use population::{PopulationBuilder, generate_population};
pub use rng::Mulberry32;
