//! Validated, immutable tables handed from one pipeline stage to the next.
//!
//! Each type can only be built by the normalizer or the join engine, so holding one
//! means its required columns exist with the declared dtypes.

use polars::prelude::{DataFrame, IntoLazy, LazyFrame};

macro_rules! typed_table {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            df: DataFrame,
        }

        impl $name {
            pub(crate) fn from_normalized(df: DataFrame) -> Self {
                Self { df }
            }

            pub fn frame(&self) -> &DataFrame {
                &self.df
            }

            /// Lazy view over a cheap clone of the underlying frame.
            pub fn lazy(&self) -> LazyFrame {
                self.df.clone().lazy()
            }

            pub fn height(&self) -> usize {
                self.df.height()
            }

            pub fn into_frame(self) -> DataFrame {
                self.df
            }
        }
    };
}

typed_table!(
    /// Film snapshots with Release_* and Viewing_* calendar fields.
    FilmViews
);
typed_table!(
    /// One row per (film, view_year, view_month) plus Month_Start.
    MonthlyViews
);
typed_table!(TotalViews);
typed_table!(
    /// Per-film attributes with Release_Year / Release_Month. May still hold duplicate films.
    FilmAttributes
);
typed_table!(
    /// MonthlyViews left-joined with TotalViews and de-duplicated FilmAttributes.
    CompleteData
);
