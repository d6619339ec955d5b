//! Build script for mediagate-service
//!
//! Compiles the proto file when the grpc feature is enabled.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "grpc")]
    {
        let proto_file = "proto/mediagate.proto";
        println!("cargo:rerun-if-changed={}", proto_file);

        tonic_build::configure()
            .build_server(true)
            .build_client(true)
            .compile(&[proto_file], &["proto"])?;
    }

    Ok(())
}
