use commentguard_core::{AccessToken, ModerationError, Page, PageCommentsApi};
use tracing::{debug, info, warn};

/// Resolves the pages to moderate from the account's managed pages.
///
/// With a page name, only the first page with exactly that name is returned.
/// Without one, every managed page is returned, each keeping its own token.
pub async fn resolve_pages(
    api: &dyn PageCommentsApi,
    account_token: &AccessToken,
    page_name: Option<&str>,
) -> Result<Vec<Page>, ModerationError> {
    let pages = api
        .list_pages(account_token)
        .await
        .map_err(|e| ModerationError::from_fetch("managed pages", &e))?;

    debug!("Account returned {} pages", pages.len());
    select_pages(pages, page_name)
}

pub fn select_pages(
    pages: Vec<Page>,
    page_name: Option<&str>,
) -> Result<Vec<Page>, ModerationError> {
    let Some(page_name) = page_name else {
        info!("Moderating all {} managed pages", pages.len());
        return Ok(pages);
    };

    let mut matches = pages.into_iter().filter(|page| page.name == page_name);
    let page = matches.next().ok_or_else(|| ModerationError::PageNotFound {
        page_name: page_name.to_string(),
    })?;

    let duplicates = matches.count();
    if duplicates > 0 {
        warn!(
            "{} more pages are named '{}'; using page {}",
            duplicates, page_name, page.id
        );
    }

    info!("Moderating page '{}' ({})", page.name, page.id);
    Ok(vec![page])
}
