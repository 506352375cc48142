pub mod shallow_water;
