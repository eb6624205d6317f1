//! Request body extraction for the site's HTML forms.

use axum::{
    extract::{Form, FromRequest, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::warn;

use crate::application::accounts::SignupSubmission;
use crate::application::posts::{ImageUpload, PostSubmission};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl From<SignupForm> for SignupSubmission {
    fn from(form: SignupForm) -> Self {
        Self {
            first_name: form.first_name,
            last_name: form.last_name,
            username: form.username,
            email: form.email,
            password1: form.password1,
            password2: form.password2,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UrlencodedPostForm {
    text: String,
    group: Option<String>,
    #[serde(rename = "image-clear")]
    image_clear: Option<String>,
}

/// Post create/edit body, accepted as multipart or urlencoded.
pub struct PostForm(pub PostSubmission);

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<UrlencodedPostForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(PostSubmission {
                text: form.text,
                group: form.group,
                image: None,
                clear_image: form.image_clear.as_deref().is_some_and(checkbox_checked),
            }));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let mut submission = PostSubmission::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) => {
                    warn!(
                        target = "postboard::http::forms",
                        status = err.status().as_u16(),
                        error = %err,
                        "failed to read multipart field"
                    );
                    return Err(err.into_response());
                }
            };

            match field.name() {
                Some("text") => {
                    submission.text = field.text().await.map_err(IntoResponse::into_response)?;
                }
                Some("group") => {
                    submission.group =
                        Some(field.text().await.map_err(IntoResponse::into_response)?);
                }
                Some("image-clear") => {
                    let value = field.text().await.map_err(IntoResponse::into_response)?;
                    submission.clear_image = checkbox_checked(&value);
                }
                Some("image") => {
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .filter(|value| !value.trim().is_empty())
                        .unwrap_or_else(|| "upload".to_string());
                    let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                    // Browsers send an empty part when no file was chosen.
                    if !bytes.is_empty() {
                        submission.image = Some(ImageUpload { filename, bytes });
                    }
                }
                _ => {}
            }
        }

        Ok(Self(submission))
    }
}

fn checkbox_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    async fn extract(content_type: &str, body: impl Into<Body>) -> PostSubmission {
        let request = Request::builder()
            .method("POST")
            .uri("/create/")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .expect("request");
        match PostForm::from_request(request, &()).await {
            Ok(PostForm(submission)) => submission,
            Err(response) => panic!("rejected with {}", response.status()),
        }
    }

    #[tokio::test]
    async fn urlencoded_fields_are_read() {
        let submission = extract(
            "application/x-www-form-urlencoded",
            "text=hello+world&group=3&image-clear=on",
        )
        .await;
        assert_eq!(submission.text, "hello world");
        assert_eq!(submission.group.as_deref(), Some("3"));
        assert!(submission.clear_image);
        assert!(submission.image.is_none());
    }

    #[tokio::test]
    async fn multipart_fields_and_file_are_read() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"text\"\r\n\r\n",
            "with picture\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"group\"\r\n\r\n",
            "\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"dot.gif\"\r\n",
            "Content-Type: image/gif\r\n\r\n",
            "GIF89a\r\n",
            "--XBOUNDARY--\r\n",
        );
        let submission = extract("multipart/form-data; boundary=XBOUNDARY", body).await;
        assert_eq!(submission.text, "with picture");
        assert_eq!(submission.group.as_deref(), Some(""));
        let image = submission.image.expect("image part");
        assert_eq!(image.filename, "dot.gif");
        assert_eq!(&image.bytes[..], b"GIF89a");
        assert!(!submission.clear_image);
    }

    #[tokio::test]
    async fn empty_file_part_means_no_upload() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"text\"\r\n\r\n",
            "no picture\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"\"\r\n",
            "Content-Type: application/octet-stream\r\n\r\n",
            "\r\n",
            "--XBOUNDARY--\r\n",
        );
        let submission = extract("multipart/form-data; boundary=XBOUNDARY", body).await;
        assert_eq!(submission.text, "no picture");
        assert!(submission.image.is_none());
    }
}
