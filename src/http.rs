//! HTTP client construction and request building for the chat endpoint.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::model::ChatPrompt;
use crate::options::RendererOptions;
use crate::transport::StreamError;

/// Build a configured HTTP client from renderer options.
///
/// Applies the timeout and proxy when set.
pub fn build_http_client(options: &RendererOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Add extra headers to a request if configured.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Build the multipart body for a chat submission: the `user_input` text
/// field plus one `images` part per attachment.
pub fn build_chat_form(prompt: &ChatPrompt) -> Result<Form, StreamError> {
    let mut form = Form::new().text("user_input", prompt.user_input.clone());

    for image in &prompt.images {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)
            .map_err(|e| StreamError::Config(format!("invalid attachment MIME type: {e}")))?;
        form = form.part("images", part);
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageAttachment;
    use std::time::Duration;

    #[test]
    fn test_build_http_client() {
        let options = RendererOptions::default().with_timeout(Duration::from_secs(30));
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let options =
            RendererOptions::default().with_proxy("http://proxy.example.com:8080".to_string());
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_build_chat_form_text_only() {
        let form = build_chat_form(&ChatPrompt::text("hello"));
        assert!(form.is_ok());
    }

    #[test]
    fn test_build_chat_form_with_images() {
        let prompt = ChatPrompt::text("look at this").with_image(ImageAttachment {
            file_name: "cat.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        });
        assert!(build_chat_form(&prompt).is_ok());
    }

    #[test]
    fn test_build_chat_form_rejects_bad_mime() {
        let prompt = ChatPrompt::text("").with_image(ImageAttachment {
            file_name: "x".to_string(),
            mime: "not a mime".to_string(),
            bytes: vec![],
        });
        assert!(matches!(
            build_chat_form(&prompt),
            Err(StreamError::Config(_))
        ));
    }
}
