//! Build script for aegis_mgmt.
//!
//! Compiles the management-protocol protobuf when the `grpc` feature is
//! enabled.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only compile protos when the grpc feature is enabled
    #[cfg(feature = "grpc")]
    {
        let proto_files = &["proto/mgmt.proto"];
        let includes = &["proto"];

        tonic_build::configure()
            .build_server(false)
            .build_client(true)
            .compile_protos(proto_files, includes)?;

        println!("cargo:rerun-if-changed=proto/mgmt.proto");
    }

    Ok(())
}
