// AWS Lambda binary entry point
//
// Build with: cargo build -p aos-provision-lambda
//
// The lambda_runtime crate provides the tokio runtime, so we use #[tokio::main]

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    aos_provision_lambda::run().await
}
