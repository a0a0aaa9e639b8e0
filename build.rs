// Generates the AuthService client and server stubs.
//
// The messages are plain `prost::Message` derives in `src/authority/proto.rs`,
// so only the service glue is generated here and no `protoc` is needed.
fn main() {
    let auth_service = tonic_build::manual::Service::builder()
        .name("AuthService")
        .package("auth")
        .method(
            tonic_build::manual::Method::builder()
                .name("is_authenticated")
                .route_name("IsAuthenticated")
                .input_type("crate::authority::proto::AuthRequest")
                .output_type("crate::authority::proto::AuthResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[auth_service]);

    println!("cargo:rerun-if-changed=build.rs");
}
