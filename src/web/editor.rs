//! Post editor: create, update and delete, for the post's author only
//!
//! The editor form is multipart so it can carry an image. Images are
//! stored as `images/blog/{uuid}.{ext}` under the media root.

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    response::Response,
};
use tera::Context as TeraContext;
use tokio::fs;
use uuid::Uuid;

use super::error::{parse_id, WebError};
use super::flash::Flash;
use super::middleware::AuthenticatedUser;
use super::render::render_page;
use super::AppState;
use crate::config::UploadConfig;
use crate::forms::{FormErrors, PostForm};
use crate::models::{CreatePostInput, PostWithMeta, UpdatePostInput, User};

const FORM_TEMPLATE: &str = "blog/post/post_form.html";
const IMAGE_DIR: &str = "images/blog";

/// An uploaded file that passed type and size checks
#[derive(Debug)]
struct UploadedImage {
    content_type: String,
    data: Bytes,
}

/// Text fields and optional image from the editor form
#[derive(Debug, Default)]
struct Submission {
    form: PostForm,
    image: Option<UploadedImage>,
    errors: FormErrors,
}

/// Read the editor's multipart body. Field and image problems are
/// collected as form errors.
async fn read_submission(multipart: &mut Multipart, config: &UploadConfig) -> Submission {
    let mut submission = Submission::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read editor form: {}", e);
                submission
                    .errors
                    .add_non_field("The form could not be read. Is the image too large?");
                break;
            }
        };

        let name = field.name().unwrap_or("").to_string();
        if name == "image" {
            let has_file = field.file_name().is_some_and(|f| !f.is_empty());
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = match field.bytes().await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("Failed to read uploaded image: {}", e);
                    submission.errors.add("image", "The image could not be read.");
                    continue;
                }
            };
            if !has_file && data.is_empty() {
                continue;
            }
            if let Some(image) = check_image(config, content_type, data, &mut submission.errors) {
                submission.image = Some(image);
            }
            continue;
        }

        let value = match field.text().await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(field = %name, "Failed to read form field: {}", e);
                continue;
            }
        };
        match name.as_str() {
            "title" => submission.form.title = value,
            "body" => submission.form.body = value,
            "status" => submission.form.status = value,
            "tags" => submission.form.tags = value,
            _ => {}
        }
    }

    submission
}

fn check_image(
    config: &UploadConfig,
    content_type: String,
    data: Bytes,
    errors: &mut FormErrors,
) -> Option<UploadedImage> {
    if !config.is_type_allowed(&content_type) {
        errors.add(
            "image",
            format!(
                "Unsupported image type {}. Allowed types: {}.",
                content_type,
                config.allowed_types.join(", ")
            ),
        );
        return None;
    }
    if data.len() as u64 > config.max_file_size {
        errors.add(
            "image",
            format!(
                "File too large. Maximum size is {} bytes.",
                config.max_file_size
            ),
        );
        return None;
    }
    Some(UploadedImage { content_type, data })
}

/// Write an image below the media root, returning its relative path
async fn save_image(config: &UploadConfig, image: &UploadedImage) -> Result<String, WebError> {
    let dir = config.path.join(IMAGE_DIR);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create upload dir {:?}: {}", dir, e))?;

    let filename = format!(
        "{}.{}",
        Uuid::new_v4(),
        config.get_extension(&image.content_type)
    );
    fs::write(dir.join(&filename), &image.data)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save image {}: {}", filename, e))?;

    tracing::info!(file = %filename, size = image.data.len(), "Image uploaded");
    Ok(format!("{}/{}", IMAGE_DIR, filename))
}

fn render_editor(
    state: &AppState,
    user: &User,
    flash: Flash,
    post: Option<&PostWithMeta>,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("form", form);
    context.insert("errors", errors);
    render_page(state, FORM_TEMPLATE, context, Some(user), flash)
}

/// GET /post/create/
pub async fn create_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
) -> Result<Response, WebError> {
    render_editor(&state, &user, flash, None, &PostForm::default(), &FormErrors::new())
}

/// POST /post/create/
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
    mut multipart: Multipart,
) -> Result<Response, WebError> {
    let Submission {
        form,
        image,
        mut errors,
    } = read_submission(&mut multipart, &state.config.upload).await;

    let cleaned = match form.validate() {
        Ok(cleaned) if errors.is_empty() => cleaned,
        Ok(_) => return render_editor(&state, &user, flash, None, &form, &errors),
        Err(form_errors) => {
            merge(&mut errors, form_errors);
            return render_editor(&state, &user, flash, None, &form, &errors);
        }
    };

    let image = match image {
        Some(image) => Some(save_image(&state.config.upload, &image).await?),
        None => None,
    };

    state
        .post_service
        .create(CreatePostInput {
            title: cleaned.title,
            body: cleaned.body,
            image,
            status: cleaned.status,
            tags: cleaned.tags,
            author_id: user.id,
        })
        .await?;

    Ok(flash.redirect("/"))
}

/// GET /post/{id}/edit/
pub async fn edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_for_author(parse_id(&id)?, &user)
        .await?;
    let form = PostForm {
        title: post.post.title.clone(),
        body: post.post.body.clone(),
        status: post.post.status.as_str().to_string(),
        tags: String::new(),
    };
    render_editor(&state, &user, flash, Some(&post), &form, &FormErrors::new())
}

/// POST /post/{id}/edit/ - Title, body, image and status; the image is
/// only replaced when a new one is uploaded
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, WebError> {
    let id = parse_id(&id)?;
    let post = state.post_service.get_for_author(id, &user).await?;

    let Submission {
        form,
        image,
        mut errors,
    } = read_submission(&mut multipart, &state.config.upload).await;

    let cleaned = match form.validate() {
        Ok(cleaned) if errors.is_empty() => cleaned,
        Ok(_) => return render_editor(&state, &user, flash, Some(&post), &form, &errors),
        Err(form_errors) => {
            merge(&mut errors, form_errors);
            return render_editor(&state, &user, flash, Some(&post), &form, &errors);
        }
    };

    let image = match image {
        Some(image) => Some(save_image(&state.config.upload, &image).await?),
        None => None,
    };

    state
        .post_service
        .update(
            id,
            &user,
            UpdatePostInput {
                title: cleaned.title,
                body: cleaned.body,
                image,
                status: cleaned.status,
            },
        )
        .await?;

    Ok(flash.redirect("/"))
}

/// GET /post/{id}/delete/ - Confirmation page
pub async fn confirm_delete(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_for_author(parse_id(&id)?, &user)
        .await?;

    let mut context = TeraContext::new();
    context.insert("post", &post);
    render_page(
        &state,
        "blog/post/post_confirm_delete.html",
        context,
        Some(&user),
        flash,
    )
}

/// POST /post/{id}/delete/
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    state.post_service.delete(parse_id(&id)?, &user).await?;
    Ok(flash.redirect("/"))
}

fn merge(into: &mut FormErrors, other: FormErrors) {
    for (field, messages) in other.fields {
        into.fields.entry(field).or_default().extend(messages);
    }
    into.non_field.extend(other.non_field);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload_config(dir: &TempDir) -> UploadConfig {
        UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size: 8,
            ..UploadConfig::default()
        }
    }

    #[test]
    fn test_check_image_rejects_type_and_size() {
        let dir = TempDir::new().unwrap();
        let config = upload_config(&dir);

        let mut errors = FormErrors::new();
        assert!(check_image(&config, "text/plain".into(), Bytes::from_static(b"x"), &mut errors).is_none());
        assert!(check_image(&config, "image/png".into(), Bytes::from_static(b"123456789"), &mut errors).is_none());
        assert_eq!(errors.fields["image"].len(), 2);

        let mut errors = FormErrors::new();
        assert!(check_image(&config, "image/png".into(), Bytes::from_static(b"png"), &mut errors).is_some());
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_save_image_under_blog_dir() {
        let dir = TempDir::new().unwrap();
        let config = upload_config(&dir);
        let image = UploadedImage {
            content_type: "image/jpeg".to_string(),
            data: Bytes::from_static(b"jpeg"),
        };

        let relative = save_image(&config, &image).await.unwrap();
        assert!(relative.starts_with("images/blog/"));
        assert!(relative.ends_with(".jpg"));
        assert_eq!(std::fs::read(dir.path().join(&relative)).unwrap(), b"jpeg");
    }

    #[test]
    fn test_merge_errors() {
        let mut errors = FormErrors::new();
        errors.add("image", "bad");
        let mut other = FormErrors::new();
        other.add("image", "worse");
        other.add("title", "missing");
        merge(&mut errors, other);
        assert_eq!(errors.fields["image"], vec!["bad", "worse"]);
        assert!(errors.has("title"));
    }
}
