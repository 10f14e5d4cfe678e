/// Comment thread behaviour: creation rules, cascades, listings
mod common;

use common::fixture;
use engagement_service::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_comment_on_missing_post_is_not_found() {
    let fx = fixture();
    let reader = fx.user("reader").await;

    let err = fx
        .engagement
        .threads
        .create_comment(reader.id, Uuid::new_v4(), "hello", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_reply_to_missing_parent_is_not_found() {
    let fx = fixture();
    let author = fx.user("author").await;
    let post = fx.post(&author, "Post").await;

    let err = fx
        .engagement
        .threads
        .create_comment(author.id, post.post.id, "reply", Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cross_post_reply_rejected_before_any_write() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let p1 = fx.post(&author, "P1").await;
    let p2 = fx.post(&author, "P2").await;
    let on_p2 = fx.comment(&author, p2.post.id, "on p2").await;

    let comments_before = fx.store.comment_rows().await;
    let notifications_before = fx.store.notification_rows().await;

    let err = fx
        .engagement
        .threads
        .create_comment(reader.id, p1.post.id, "sneaky", Some(on_p2.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidRelation(_)));
    assert_eq!(fx.store.comment_rows().await, comments_before);
    assert_eq!(fx.store.notification_rows().await, notifications_before);
}

#[tokio::test]
async fn test_blank_comment_is_validation_error() {
    let fx = fixture();
    let author = fx.user("author").await;
    let post = fx.post(&author, "Post").await;

    let err = fx
        .engagement
        .threads
        .create_comment(author.id, post.post.id, "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_deleting_top_level_comment_removes_its_replies() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "Thread").await;

    let parent = fx.comment(&author, post.post.id, "parent").await;
    for i in 0..3 {
        fx.reply(&reader, post.post.id, parent.id, &format!("reply {}", i))
            .await;
    }
    let unrelated = fx.comment(&reader, post.post.id, "unrelated").await;
    assert_eq!(fx.store.comment_rows().await, 5);

    let removed = fx
        .engagement
        .threads
        .delete_comment(author.id, parent.id)
        .await
        .unwrap();

    assert_eq!(removed, 4);
    assert_eq!(fx.store.comment_rows().await, 1);
    assert!(fx.engagement.threads.get_comment(unrelated.id).await.is_ok());
}

#[tokio::test]
async fn test_deleting_reply_removes_only_that_reply() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "Thread").await;

    let parent = fx.comment(&author, post.post.id, "parent").await;
    let reply = fx.reply(&reader, post.post.id, parent.id, "mine").await;
    fx.reply(&author, post.post.id, parent.id, "other").await;

    let removed = fx
        .engagement
        .threads
        .delete_comment(reader.id, reply.id)
        .await
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(fx.store.comment_rows().await, 2);
}

#[tokio::test]
async fn test_only_owner_may_update_or_delete() {
    let fx = fixture();
    let author = fx.user("author").await;
    let intruder = fx.user("intruder").await;
    let post = fx.post(&author, "Post").await;
    let comment = fx.comment(&author, post.post.id, "original").await;

    let err = fx
        .engagement
        .threads
        .update_comment(intruder.id, comment.id, "defaced")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = fx
        .engagement
        .threads
        .delete_comment(intruder.id, comment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = fx
        .engagement
        .threads
        .update_comment(author.id, comment.id, "edited")
        .await
        .unwrap();
    assert_eq!(updated.comment.content, "edited");
}

#[tokio::test]
async fn test_update_does_not_notify() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "Post").await;
    let comment = fx.comment(&reader, post.post.id, "hi").await;
    assert_eq!(fx.store.notification_rows().await, 1);

    fx.engagement
        .threads
        .update_comment(reader.id, comment.id, "hi again")
        .await
        .unwrap();
    assert_eq!(fx.store.notification_rows().await, 1);
}

#[tokio::test]
async fn test_list_by_post_nests_replies_in_creation_order() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "Thread").await;

    let first = fx.comment(&author, post.post.id, "first").await;
    let second = fx.comment(&reader, post.post.id, "second").await;
    let r1 = fx.reply(&reader, post.post.id, first.id, "r1").await;
    let r2 = fx.reply(&author, post.post.id, first.id, "r2").await;

    let listed = fx.engagement.threads.list_by_post(post.post.id).await.unwrap();
    let top: Vec<Uuid> = listed.iter().map(|c| c.comment.id).collect();
    assert_eq!(top, vec![first.id, second.id]);

    let replies = listed[0].replies.as_ref().unwrap();
    let reply_ids: Vec<Uuid> = replies.iter().map(|c| c.comment.id).collect();
    assert_eq!(reply_ids, vec![r1.id, r2.id]);
    assert_eq!(listed[0].counts.replies, 2);
    assert_eq!(listed[0].author.as_ref().unwrap().username, "author");
    assert!(listed[1].replies.as_ref().unwrap().is_empty());

    let direct = fx.engagement.threads.list_replies(first.id).await.unwrap();
    assert_eq!(direct.len(), 2);
    assert_eq!(direct[0].comment.id, r1.id);
}

#[tokio::test]
async fn test_list_replies_of_missing_parent_is_not_found() {
    let fx = fixture();
    let err = fx
        .engagement
        .threads
        .list_replies(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_list_comments_filters_and_paginates() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "Thread").await;

    let parent = fx.comment(&author, post.post.id, "a").await;
    fx.comment(&reader, post.post.id, "b").await;
    fx.comment(&reader, post.post.id, "c").await;
    fx.reply(&reader, post.post.id, parent.id, "reply").await;

    let page = fx
        .engagement
        .threads
        .list_comments(Some(post.post.id), None, 1, 2)
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.comments.len(), 2);
    assert_eq!(page.comments[0].comment.content, "a");

    let by_reader = fx
        .engagement
        .threads
        .list_comments(None, Some(reader.id), 1, 20)
        .await
        .unwrap();
    assert_eq!(by_reader.pagination.total, 3);

    let newest_first = fx.engagement.threads.list_by_user(reader.id).await.unwrap();
    assert_eq!(newest_first.len(), 3);
    assert_eq!(newest_first[0].comment.content, "reply");
}
