#[tokio::main]
async fn main() -> anyhow::Result<()> {
    guestbook::start_server().await
}
