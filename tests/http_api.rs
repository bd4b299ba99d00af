use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;

use gemini_vision_chat::config::Config;
use gemini_vision_chat::server::Server;

fn png(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_pixel(width, height, Rgba([30, 160, 90, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

async fn start(model: &str, port: u16) -> (Client, String) {
    let mut config = Config::default();
    config.gemini.model = model.to_string();
    config.ui.wait_delay_ms = 0;
    config.server.port = port;

    let server = Server::new(&config).unwrap();
    tokio::spawn(async move {
        let _: anyhow::Result<()> = server.run().await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(500)).await;

    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    (client, format!("http://127.0.0.1:{}", port))
}

async fn upload(client: &Client, base: &str, name: &str, bytes: Vec<u8>) -> reqwest::Response {
    let form = Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()));
    client
        .post(format!("{}/api/image", base))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_http_chat_flow() {
    let (client, base) = start("mock/test", 31421).await;

    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Chat with Gemini Vision"));

    let body: Value = client
        .get(format!("{}/api/session", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["state"], "empty");
    assert_eq!(body["model"], "mock/test");
    assert!(body["image"].is_null());

    // Submit before any upload is rejected with a warning
    let resp = client
        .post(format!("{}/api/submit", base))
        .json(&json!({ "prompt": "Describe this" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"]["type"], "rejected");
    assert_eq!(body["notices"][0]["kind"], "warning");
    assert_eq!(
        body["notices"][0]["text"],
        "Please upload an image before submitting a prompt."
    );
    assert_eq!(body["session"]["messages"].as_array().unwrap().len(), 0);

    // Whitespace is still a prompt
    let body: Value = client
        .post(format!("{}/api/submit", base))
        .json(&json!({ "prompt": "   " }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["type"], "rejected");
    assert_eq!(body["notices"][0]["kind"], "warning");

    let resp = upload(&client, &base, "cat.png", png(64, 48)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["session"]["state"], "image_loaded");
    assert_eq!(body["session"]["image"]["name"], "cat.png");
    assert_eq!(body["session"]["image"]["width"], 64);
    assert_eq!(body["session"]["image"]["media_type"], "image/png");

    let resp = client.get(format!("{}/api/image", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(resp.bytes().await.unwrap().to_vec(), png(64, 48));

    let body: Value = client
        .post(format!("{}/api/submit", base))
        .json(&json!({ "prompt": "What is in this image?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["type"], "answered");
    let messages = body["session"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "What is in this image?");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(
        messages[1]["content"],
        "Mock response: What is in this image? (image/png)"
    );
    assert_eq!(body["session"]["state"], "conversing");

    // A bad upload leaves the current image in place
    let resp = upload(&client, &base, "notes.txt", b"hello".to_vec()).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = upload(&client, &base, "fake.png", b"not really a png".to_vec()).await;
    assert_eq!(resp.status(), 400);

    let body: Value = client
        .get(format!("{}/api/session", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["image"]["name"], "cat.png");
    assert_eq!(body["state"], "conversing");
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    // An upload with no file clears the image but keeps the history
    let resp = client
        .post(format!("{}/api/image", base))
        .multipart(Form::new().text("note", "nothing selected"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"]["type"], "image_cleared");
    assert!(body["session"]["image"].is_null());
    assert_eq!(body["session"]["messages"].as_array().unwrap().len(), 2);

    let resp = client.get(format!("{}/api/image", base)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = client
        .post(format!("{}/api/clear", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["type"], "cleared");
    assert_eq!(body["notices"][0]["text"], "Chat history cleared!");
    assert_eq!(body["session"]["state"], "empty");
    assert_eq!(body["session"]["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_http_soft_error_reply() {
    let (client, base) = start("mock/invalid", 31422).await;

    let resp = upload(&client, &base, "photo.png", png(2, 2)).await;
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .post(format!("{}/api/submit", base))
        .json(&json!({ "prompt": "Describe" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["outcome"]["reply"],
        "Error: Invalid response from Gemini Vision API."
    );
    assert_eq!(
        body["session"]["messages"][1]["content"],
        "Error: Invalid response from Gemini Vision API."
    );
}
