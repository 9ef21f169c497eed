pub mod pddikti;
