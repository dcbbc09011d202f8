//! Type descriptor fixtures for a small shop application

use rewire_kernel::types::{
    Marker, Operation, REPOSITORY_CAPABILITY, TypeDescriptor, TypeHandle,
};
use rewire_kernel::HotReloadConfig;

pub const PROJECT: &str = "com.shop";
pub const DOMAIN: &str = "com.shop.domain";
pub const DTO: &str = "com.shop.web.dto";

/// Enabled configuration for the shop packages
pub fn config() -> HotReloadConfig {
    HotReloadConfig::new()
        .with_enabled(true)
        .with_project_package(PROJECT)
        .with_domain_package(DOMAIN)
        .with_dto_package(DTO)
}

pub fn service(simple_name: &str) -> TypeDescriptor {
    TypeDescriptor::new(&format!("{PROJECT}.service.{simple_name}")).with_marker(Marker::Service)
}

pub fn controller(simple_name: &str, operations: &[Operation]) -> TypeDescriptor {
    operations.iter().fold(
        TypeDescriptor::new(&format!("{PROJECT}.web.{simple_name}"))
            .with_marker(Marker::RestController),
        |ty, op| ty.with_operation(op.clone()),
    )
}

pub fn repository(simple_name: &str) -> TypeDescriptor {
    TypeDescriptor::new(&format!("{PROJECT}.repo.{simple_name}"))
        .with_marker(Marker::Repository)
        .with_capability(REPOSITORY_CAPABILITY)
}

pub fn entity(simple_name: &str) -> TypeHandle {
    TypeDescriptor::new(&format!("{DOMAIN}.{simple_name}"))
        .with_marker(Marker::Entity)
        .into_handle()
}

pub fn dto(simple_name: &str) -> TypeHandle {
    TypeDescriptor::new(&format!("{DTO}.{simple_name}")).into_handle()
}

/// Qualified name of a fixture service
pub fn service_type(simple_name: &str) -> String {
    format!("{PROJECT}.service.{simple_name}")
}
