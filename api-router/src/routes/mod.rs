pub mod controlplane;
pub mod dataplane;
pub mod liveness;
pub mod readiness;
