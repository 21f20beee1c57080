mod doubles;
mod store;
