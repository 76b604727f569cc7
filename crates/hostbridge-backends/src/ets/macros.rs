//! `ets_exports!`: ETS shells, registered by pointer.

/// Declare ETS exports for one module.
///
/// Emits one `extern "C"` shell per declaration and a registrar that
/// adds them to an [`ExportsBuilder`](hostbridge_registry::ExportsBuilder).
///
/// ```ignore
/// hostbridge_backends::ets_exports! {
///     env: MyEtsEnv,
///     module: InteropNativeModule,
///     registrar: register_interop,
///     exports: {
///         fn GetAnswer() -> KInt = answer;
///         ctx fn Reenter(kind: KInt) -> KInt = reenter;
///     }
/// }
/// ```
#[macro_export]
macro_rules! ets_exports {
    (
        env: $env:ty,
        module: $module:ident,
        registrar: $registrar:ident,
        exports: { $($items:tt)* } $(,)?
    ) => {
        $crate::__export_items!(__ets_shell item [$env, $module] $($items)*);

        pub fn $registrar(builder: &mut $crate::__private::ExportsBuilder) {
            $crate::__export_items!(__ets_shell (register builder) [$env, $module] $($items)*);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __ets_shell {
    (item plain [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            pub extern "C" fn [<ets_ $module _ $name>](
                env: <$env as $crate::ets::EtsEnv>::Raw,
                _class: <$env as $crate::ets::EtsEnv>::Ref,
                $($arg: <$ty as $crate::__private::FromHost<$crate::ets::Ets<$env>>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::ToHost<$crate::ets::Ets<$env>>>::Interop {
                // SAFETY: the VM passes the environment of the calling thread.
                let env = unsafe { <$env as $crate::ets::EtsEnv>::from_raw(env) };
                $crate::__private::tracing::trace!(export = stringify!($name), "ets call");
                $crate::__private::Invoke::<$crate::ets::Ets<$env>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke(
                    &$imp,
                    env,
                    ($($arg,)*),
                )
            }
        }
    };

    (item context [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            pub extern "C" fn [<ets_ $module _ $name>](
                env: <$env as $crate::ets::EtsEnv>::Raw,
                _class: <$env as $crate::ets::EtsEnv>::Ref,
                $($arg: <$ty as $crate::__private::FromHost<$crate::ets::Ets<$env>>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::ToHost<$crate::ets::Ets<$env>>>::Interop {
                // SAFETY: the VM passes the environment of the calling thread.
                let env = unsafe { <$env as $crate::ets::EtsEnv>::from_raw(env) };
                $crate::__private::tracing::trace!(export = stringify!($name), "ets call");
                $crate::__private::InvokeWithContext::<$crate::ets::Ets<$env>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_with_context(
                    &$imp,
                    env,
                    ($($arg,)*),
                )
            }
        }
    };

    (item direct [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            pub extern "C" fn [<ets_ $module _ $name>](
                $($arg: <$ty as $crate::__private::DirectFromHost<$crate::ets::Ets<$env>>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::DirectToHost<$crate::ets::Ets<$env>>>::Interop {
                $crate::__private::InvokeDirect::<$crate::ets::Ets<$env>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_direct(
                    &$imp,
                    ($($arg,)*),
                )
            }
        }
    };

    ((register $builder:ident) $variant:ident [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            $crate::__register_export!($builder $variant $module $name [$($ty),*] [$($ret)?] [<ets_ $module _ $name>]);
        }
    };
}
