#![allow(dead_code)]

use axum::Router;

pub const PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="tsports" tvg-logo="http://img.example.com/tsports.png" group-title="Sports",T Sports
http://stream.example.com/tsports/index.m3u8
#EXTINF:-1 group-title="Sports",Ten Cricket
http://stream.example.com/ten.mp4
"#;

pub const STATIC_DATA: &str = r#"{
  "live_events": [
    {"title": "T20 Final", "teams": "Bangladesh vs India", "date": "05/03/2025", "time": "7:30 PM", "logo1": "", "logo2": ""}
  ],
  "categories": [{"name": "Cricket", "flag": "🏏"}]
}"#;

pub const MASTER_PLAYLIST: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720
720p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=640000,RESOLUTION=640x360
360p.m3u8
";

/// Serves `app` on an ephemeral port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
