pub mod naive_delta;
