// Aggregator - Agrégation des verifiers et constraint checkers d'un runtime
//
// A runtime picks its verifiers and its pieces and folds each list into one
// outer enum. The outer enums dispatch every call to the variant they wrap,
// so the executive only ever sees a single verifier type and a single
// checker type.

/// Declares an outer verifier enum.
///
/// ```ignore
/// aggregate_verifier! {
///     pub enum OuterVerifier {
///         Ed25519(Ed25519Signature),
///         UpForGrabs(UpForGrabs),
///     }
/// }
/// ```
///
/// Generates the enum, a `From` impl per variant and a [`Verifier`] impl.
///
/// [`Verifier`]: crate::verifier::Verifier
#[macro_export]
macro_rules! aggregate_verifier {
    (
        $(#[$meta:meta])*
        $vis:vis enum $outer:ident {
            $($variant:ident($inner:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $outer {
            $($variant($inner)),+
        }

        $(
            impl From<$inner> for $outer {
                fn from(inner: $inner) -> Self {
                    $outer::$variant(inner)
                }
            }
        )+

        impl $crate::verifier::Verifier for $outer {
            fn verify(
                &self,
                simplified_tx: &[u8],
                block_height: $crate::types::BlockNumber,
                redeemer: &[u8],
            ) -> Result<(), $crate::verifier::VerifierError> {
                match self {
                    $($outer::$variant(inner) => {
                        $crate::verifier::Verifier::verify(inner, simplified_tx, block_height, redeemer)
                    })+
                }
            }
        }
    };
}

/// Declares an outer constraint checker enum for a given outer verifier,
/// together with its error enum.
///
/// ```ignore
/// aggregate_constraint_checker! {
///     verifier: OuterVerifier;
///     error: OuterConstraintCheckerError;
///     pub enum OuterConstraintChecker {
///         Money(MoneyConstraintChecker<0>),
///         SetTimestamp(InherentAdapter<SetTimestamp>),
///     }
/// }
/// ```
///
/// The generated checker is its own set of inherent hooks: previous
/// inherents are routed to the piece that created them, and the inherents
/// and genesis transactions of every piece are concatenated in declaration
/// order.
#[macro_export]
macro_rules! aggregate_constraint_checker {
    (
        verifier: $verifier:ty;
        error: $error:ident;
        $(#[$meta:meta])*
        $vis:vis enum $outer:ident {
            $($variant:ident($inner:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $outer {
            $($variant($inner)),+
        }

        /// Erreur d'un des checkers agrégés
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $error {
            $($variant(<$inner as $crate::constraint_checker::ConstraintChecker<$verifier>>::Error)),+
        }

        impl ::std::fmt::Display for $error {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $($error::$variant(e) => write!(f, "{}: {}", stringify!($variant), e)),+
                }
            }
        }

        impl ::std::error::Error for $error {}

        $(
            impl From<$inner> for $outer {
                fn from(inner: $inner) -> Self {
                    $outer::$variant(inner)
                }
            }
        )+

        impl $crate::constraint_checker::ConstraintChecker<$verifier> for $outer {
            type Error = $error;
            type Hooks = Self;

            fn check(
                &self,
                inputs: &[$crate::types::ResolvedInput],
                peeks: &[$crate::types::DynamicallyTypedData],
                outputs: &[$crate::types::DynamicallyTypedData],
                block_height: $crate::types::BlockNumber,
            ) -> Result<$crate::types::Weight, Self::Error> {
                match self {
                    $($outer::$variant(inner) => {
                        <$inner as $crate::constraint_checker::ConstraintChecker<$verifier>>::check(
                            inner, inputs, peeks, outputs, block_height,
                        )
                        .map_err($error::$variant)
                    })+
                }
            }

            fn is_inherent(&self) -> bool {
                match self {
                    $($outer::$variant(inner) => {
                        <$inner as $crate::constraint_checker::ConstraintChecker<$verifier>>::is_inherent(inner)
                    })+
                }
            }
        }

        impl $crate::inherents::InherentHooks<$verifier, $outer> for $outer {
            fn create_inherents(
                authoring_data: &$crate::inherents::InherentData,
                previous_inherents: Vec<($crate::types::Transaction<$verifier, $outer>, $crate::types::Hash)>,
                block_height: $crate::types::BlockNumber,
            ) -> Result<Vec<$crate::types::Transaction<$verifier, $outer>>, $crate::inherents::InherentError> {
                let mut all_inherents = Vec::new();
                $(
                    #[allow(unreachable_patterns)]
                    let previous: Vec<($crate::types::Transaction<$verifier, $inner>, $crate::types::Hash)> =
                        previous_inherents
                            .iter()
                            .filter_map(|(tx, hash)| match &tx.checker {
                                $outer::$variant(inner) => {
                                    Some((tx.clone().map_checker(|_| inner.clone()), *hash))
                                }
                                _ => None,
                            })
                            .collect();

                    let created = <<$inner as $crate::constraint_checker::ConstraintChecker<$verifier>>::Hooks
                        as $crate::inherents::InherentHooks<$verifier, $inner>>::create_inherents(
                            authoring_data,
                            previous,
                            block_height,
                        )?;
                    all_inherents.extend(created.into_iter().map(|tx| tx.map_checker($outer::$variant)));
                )+
                Ok(all_inherents)
            }

            fn check_inherents(
                importing_data: &$crate::inherents::InherentData,
                inherents: Vec<$crate::types::Transaction<$verifier, $outer>>,
                results: &mut $crate::inherents::CheckInherentsResult,
            ) {
                $(
                    #[allow(unreachable_patterns)]
                    let mine: Vec<$crate::types::Transaction<$verifier, $inner>> = inherents
                        .iter()
                        .filter_map(|tx| match &tx.checker {
                            $outer::$variant(inner) => Some(tx.clone().map_checker(|_| inner.clone())),
                            _ => None,
                        })
                        .collect();

                    <<$inner as $crate::constraint_checker::ConstraintChecker<$verifier>>::Hooks
                        as $crate::inherents::InherentHooks<$verifier, $inner>>::check_inherents(
                            importing_data,
                            mine,
                            results,
                        );
                )+
            }

            fn genesis_transactions() -> Vec<$crate::types::Transaction<$verifier, $outer>> {
                let mut all_transactions = Vec::new();
                $(
                    all_transactions.extend(
                        <<$inner as $crate::constraint_checker::ConstraintChecker<$verifier>>::Hooks
                            as $crate::inherents::InherentHooks<$verifier, $inner>>::genesis_transactions()
                            .into_iter()
                            .map(|tx| tx.map_checker($outer::$variant)),
                    );
                )+
                all_transactions
            }
        }
    };
}
